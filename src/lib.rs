//! Reefdapp: minimal Reef DApp. Binds the wallet's selected signer, watches its
//! balance, and tells the UI when the DApp is connected.
//!
//! # Architecture
//!
//! ```text
//! ExtensionGateway (Reef extension / memory)
//!   │ selected signer changed
//!   ▼
//! ConnectionController ── ConnectionState (signer, generation, EVM claim, subscription)
//!   │
//!   ├── Signer: address, is_evm_claimed, claim_evm_address, subscribe_balance
//!   │
//!   └── EventSink (DOM CustomEvents / ChannelBus)
//!         balance-value, signer-change, display-error, clear-error,
//!         evm-connected, dapp-connected, tx-progress, tx-complete
//! ```
//!
//! # Connection rules
//!
//! | EVM claimed | Balance | Emitted after `balance-value` |
//! |-------------|---------|-------------------------------|
//! | no | < threshold | `display-error` (funding advisory) |
//! | no | ≥ threshold | `clear-error`, `dapp-connected` |
//! | yes | any | `evm-connected`, `clear-error`, `dapp-connected` |
//!
//! # Features
//!
//! - `native` - CLI, tokio runtime, terminal logging
//! - `wasm` - Browser glue (DOM events, injected Reef extension)
//!
//! # Usage
//!
//! ```ignore
//! use reefdapp::{ChannelBus, ConnectionController, DappConfig, MemoryExtension, MemoryGateway, MemorySigner};
//! use std::rc::Rc;
//!
//! let bus = ChannelBus::new();
//! let mut events = bus.subscribe();
//! let controller = ConnectionController::new(DappConfig::default(), Rc::new(bus))?;
//!
//! let extension = MemoryExtension::new();
//! extension.select(Some(MemorySigner::new("5F...").with_balance("5000000000000000000")));
//! controller.connect(&MemoryGateway::new(extension)).await;
//! controller.process_pending().await;
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod core;
pub mod memory;

// =============================================================================
// Native-only modules
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;

// =============================================================================
// WASM-only modules (browser, wasm-bindgen)
// =============================================================================
#[cfg(feature = "wasm")]
pub mod wasm;

// =============================================================================
// Re-exports
// =============================================================================
pub use crate::core::balance::Balance;
pub use crate::core::bus::{ChannelBus, EventSink};
pub use crate::core::config::DappConfig;
pub use crate::core::controller::{Command, ConnectionController};
pub use crate::core::error::{BalanceError, DappError, DappResult};
pub use crate::core::events::{DappEvent, ErrorNotice, InboundEvent};
pub use crate::core::signer::{Extension, ExtensionGateway, Signer, Subscription};
pub use crate::core::state::{ConnectionState, Phase};
pub use memory::{MemoryExtension, MemoryGateway, MemorySigner};

#[cfg(feature = "wasm")]
pub use wasm::{DomEventBus, MinimalDapp};

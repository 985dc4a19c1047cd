//! Platform-independent core: compiles for native and wasm alike.

pub mod balance;
pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod signer;
pub mod state;

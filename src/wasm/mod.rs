//! WASM module: the DApp in the browser
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          MinimalDapp (JS API)           │
//! │  new(appName), start(), phase           │
//! └──────┬──────────────────────────┬───────┘
//!        │ DOM listeners            │ spawn_local
//! ┌──────▼──────────┐     ┌─────────▼───────────────┐
//! │   DomEventBus   │◄────│  ConnectionController   │
//! │  CustomEvents   │     │  inbox → run()          │
//! └─────────────────┘     └─────────┬───────────────┘
//!                                   │
//!                         ┌─────────▼───────────────┐
//!                         │ ReefGateway / ReefSigner│
//!                         │ window.injectedWeb3.reef│
//!                         └─────────────────────────┘
//! ```

mod app;
mod console;
mod dom;
mod extension;

pub use app::MinimalDapp;
pub use console::init_console_tracing;
pub use dom::{listen, DomEventBus, DomListener};
pub use extension::{ReefExtension, ReefGateway, ReefSigner};

use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    init_console_tracing();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

macro_rules! log {
    ($($t:tt)*) => {
        crate::wasm::console_log(&format!($($t)*))
    }
}

pub(crate) use log;

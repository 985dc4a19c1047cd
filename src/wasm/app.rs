//! MinimalDapp: the JS entry point
//!
//! ```js
//! import init, { MinimalDapp } from "reefdapp";
//! await init();
//! const dapp = new MinimalDapp("Minimal DApp Example");
//! dapp.start();
//! document.addEventListener("dapp-connected", () => showContractUi());
//! document.dispatchEvent(new CustomEvent("bind-evm-address", { detail: address }));
//! ```

use std::cell::RefCell;
use wasm_bindgen::prelude::*;

use super::dom::{listen, string_detail, DomEventBus, DomListener};
use super::extension::ReefGateway;
use super::log;
use crate::core::config::DappConfig;
use crate::core::controller::ConnectionController;
use crate::core::events::{names, InboundEvent};

#[wasm_bindgen]
pub struct MinimalDapp {
    controller: ConnectionController,
    listeners: RefCell<Vec<DomListener>>,
}

#[wasm_bindgen]
impl MinimalDapp {
    #[wasm_bindgen(constructor)]
    pub fn new(app_name: Option<String>) -> Result<MinimalDapp, JsValue> {
        let config = app_name.map(DappConfig::new).unwrap_or_default();
        let bus = DomEventBus::new()?;
        let controller = ConnectionController::new(config, std::rc::Rc::new(bus))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { controller, listeners: RefCell::new(Vec::new()) })
    }

    /// Wire DOM listeners, start the command loop, connect once the page has loaded
    #[wasm_bindgen]
    pub fn start(&self) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
        let mut listeners = self.listeners.borrow_mut();
        if !listeners.is_empty() {
            log!("[reefdapp] already started");
            return Ok(());
        }

        for &name in names::INBOUND {
            let controller = self.controller.clone();
            listeners.push(listen(&document, name, move |event| {
                if let Some(inbound) = InboundEvent::parse(name, string_detail(&event)) {
                    controller.dispatch(inbound);
                }
            })?);
        }

        let runner = self.controller.clone();
        wasm_bindgen_futures::spawn_local(async move { runner.run().await });

        if page_loaded(&document.ready_state()) {
            spawn_connect(self.controller.clone());
        } else {
            let controller = self.controller.clone();
            listeners.push(listen(&window, "load", move |_| spawn_connect(controller.clone()))?);
        }
        Ok(())
    }

    /// Current connection phase (`disconnected`, `identity-selected`, `awaiting-funding`, `evm-connected`)
    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        self.controller.phase().as_str().to_string()
    }
}

/// `document.readyState` once the `load` event has already fired
fn page_loaded(ready_state: &str) -> bool {
    ready_state == "complete"
}

fn spawn_connect(controller: ConnectionController) {
    wasm_bindgen_futures::spawn_local(async move {
        controller.connect(&ReefGateway).await;
    });
}

//! DOM events as the controller's pub/sub channel

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, CustomEventInit, Document, Event, EventTarget};

use super::log;
use crate::core::bus::EventSink;
use crate::core::events::DappEvent;

/// Dispatches controller notifications on `document`
pub struct DomEventBus {
    document: Document,
}

impl DomEventBus {
    pub fn new() -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Ok(Self { document })
    }

    fn to_dom_event(event: &DappEvent) -> Result<Event, JsValue> {
        match event.detail() {
            Some(detail) => {
                let serializer = serde_wasm_bindgen::Serializer::json_compatible();
                let detail = detail
                    .serialize(&serializer)
                    .map_err(|e| JsValue::from_str(&e.to_string()))?;
                let init = CustomEventInit::new();
                init.set_detail(&detail);
                CustomEvent::new_with_event_init_dict(event.name(), &init).map(Event::from)
            }
            None => Event::new(event.name()),
        }
    }
}

impl EventSink for DomEventBus {
    fn emit(&self, event: DappEvent) {
        let dispatched = Self::to_dom_event(&event).and_then(|e| self.document.dispatch_event(&e));
        if let Err(err) = dispatched {
            log!("[reefdapp] failed to dispatch {}: {:?}", event.name(), err);
        }
    }
}

/// Registered event listener; removed on drop
pub struct DomListener {
    target: EventTarget,
    name: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Drop for DomListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.name, self.closure.as_ref().unchecked_ref());
    }
}

pub fn listen(
    target: &EventTarget,
    name: &'static str,
    handler: impl FnMut(Event) + 'static,
) -> Result<DomListener, JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    Ok(DomListener { target: target.clone(), name, closure })
}

/// String `detail` of a `CustomEvent`, if any
pub fn string_detail(event: &Event) -> Option<String> {
    event.dyn_ref::<CustomEvent>().and_then(|e| e.detail().as_string())
}

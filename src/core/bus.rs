//! Event bus: where controller notifications go.
//!
//! The browser build dispatches DOM events; everything else fans out over
//! unbounded channels so the notifications can be observed without a DOM.

use futures::channel::mpsc;
use std::cell::RefCell;
use std::rc::Rc;

use super::events::DappEvent;

/// Sink for outbound notifications
pub trait EventSink {
    fn emit(&self, event: DappEvent);
}

impl<T: EventSink + ?Sized> EventSink for Rc<T> {
    fn emit(&self, event: DappEvent) {
        (**self).emit(event)
    }
}

/// In-process bus. Every subscriber receives every event in emission order.
#[derive(Clone, Default)]
pub struct ChannelBus {
    watchers: Rc<RefCell<Vec<mpsc::UnboundedSender<DappEvent>>>>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DappEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.watchers.borrow_mut().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

impl EventSink for ChannelBus {
    fn emit(&self, event: DappEvent) {
        tracing::trace!(event = event.name(), "emit");
        self.watchers
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }
}

/// Collect everything currently queued on a subscription without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<DappEvent>) -> Vec<DappEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = rx.try_next() {
        events.push(event);
    }
    events
}

//! In-process collaborators: a scriptable signer and extension.
//!
//! Behave like the Reef extension does in the browser: balance subscriptions
//! and selected-signer subscriptions deliver the current value immediately,
//! then every change. Used by the CLI, tests, and headless embedding.

use async_trait::async_trait;
use futures::channel::oneshot;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::core::error::{DappError, DappResult};
use crate::core::signer::{BalanceCallback, Extension, ExtensionGateway, Signer, SignerCallback, Subscription};

#[derive(Default)]
struct SignerState {
    address: String,
    balance: Option<String>,
    evm_claimed: bool,
    claim_failure: Option<String>,
    subscribe_failure: Option<String>,
    claimed_check_failure: Option<String>,
    address_failure: Option<String>,
    claimed_gate: Option<oneshot::Receiver<()>>,
    address_gate: Option<oneshot::Receiver<()>>,
    listeners: Vec<(u64, Rc<dyn Fn(String)>)>,
    next_listener: u64,
    claimed_checks: usize,
    claim_calls: usize,
}

/// Scriptable signer. Clones share state.
#[derive(Clone)]
pub struct MemorySigner {
    state: Rc<RefCell<SignerState>>,
}

impl MemorySigner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(SignerState { address: address.into(), ..Default::default() })),
        }
    }

    pub fn with_balance(self, raw: impl Into<String>) -> Self {
        self.state.borrow_mut().balance = Some(raw.into());
        self
    }

    pub fn with_evm_claimed(self, claimed: bool) -> Self {
        self.state.borrow_mut().evm_claimed = claimed;
        self
    }

    /// Make `claim_evm_address` fail with `reason`
    pub fn failing_claim(self, reason: impl Into<String>) -> Self {
        self.state.borrow_mut().claim_failure = Some(reason.into());
        self
    }

    /// Make `subscribe_balance` fail with `reason`
    pub fn failing_subscribe(self, reason: impl Into<String>) -> Self {
        self.state.borrow_mut().subscribe_failure = Some(reason.into());
        self
    }

    /// Make `is_evm_claimed` fail with `reason`
    pub fn failing_claimed_check(self, reason: impl Into<String>) -> Self {
        self.state.borrow_mut().claimed_check_failure = Some(reason.into());
        self
    }

    /// Make `address` fail with `reason`
    pub fn failing_address(self, reason: impl Into<String>) -> Self {
        self.state.borrow_mut().address_failure = Some(reason.into());
        self
    }

    /// The next `is_evm_claimed` call waits until the returned sender fires (or is dropped)
    pub fn hold_next_claimed_check(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.borrow_mut().claimed_gate = Some(rx);
        tx
    }

    /// The next `address` call waits until the returned sender fires (or is dropped)
    pub fn hold_next_address(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.borrow_mut().address_gate = Some(rx);
        tx
    }

    pub fn address_now(&self) -> String {
        self.state.borrow().address.clone()
    }

    /// New on-chain free balance; delivered to every live subscription
    pub fn push_balance(&self, raw: impl Into<String>) {
        let raw = raw.into();
        let listeners: Vec<_> = {
            let mut state = self.state.borrow_mut();
            state.balance = Some(raw.clone());
            state.listeners.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for cb in listeners {
            cb(raw.clone());
        }
    }

    pub fn set_evm_claimed(&self, claimed: bool) {
        self.state.borrow_mut().evm_claimed = claimed;
    }

    /// Number of `is_evm_claimed` queries served
    pub fn claimed_checks(&self) -> usize {
        self.state.borrow().claimed_checks
    }

    pub fn claim_calls(&self) -> usize {
        self.state.borrow().claim_calls
    }

    pub fn live_subscriptions(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

#[async_trait(?Send)]
impl Signer for MemorySigner {
    async fn address(&self) -> DappResult<String> {
        let gate = self.state.borrow_mut().address_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let state = self.state.borrow();
        match &state.address_failure {
            Some(reason) => Err(DappError::Signer(reason.clone())),
            None => Ok(state.address.clone()),
        }
    }

    async fn is_evm_claimed(&self) -> DappResult<bool> {
        let gate = self.state.borrow_mut().claimed_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let mut state = self.state.borrow_mut();
        state.claimed_checks += 1;
        match &state.claimed_check_failure {
            Some(reason) => Err(DappError::Signer(reason.clone())),
            None => Ok(state.evm_claimed),
        }
    }

    async fn claim_evm_address(&self) -> DappResult<()> {
        let mut state = self.state.borrow_mut();
        state.claim_calls += 1;
        if let Some(reason) = &state.claim_failure {
            return Err(DappError::Claim(reason.clone()));
        }
        state.evm_claimed = true;
        Ok(())
    }

    async fn subscribe_balance(&self, on_balance: BalanceCallback) -> DappResult<Subscription> {
        let on_balance: Rc<dyn Fn(String)> = Rc::from(on_balance);
        let (id, current) = {
            let mut state = self.state.borrow_mut();
            if let Some(reason) = &state.subscribe_failure {
                return Err(DappError::Subscription(reason.clone()));
            }
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.push((id, on_balance.clone()));
            (id, state.balance.clone())
        };
        if let Some(raw) = current {
            on_balance(raw);
        }
        let weak: Weak<RefCell<SignerState>> = Rc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().listeners.retain(|(i, _)| *i != id);
            }
        }))
    }
}

#[derive(Default)]
struct ExtensionState {
    selected: Option<Rc<dyn Signer>>,
    listeners: Vec<(u64, Rc<dyn Fn(Option<Rc<dyn Signer>>)>)>,
    next_listener: u64,
}

/// Scriptable wallet extension. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryExtension {
    state: Rc<RefCell<ExtensionState>>,
}

impl MemoryExtension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the selected account (or hide all accounts with `None`)
    pub fn select(&self, signer: Option<MemorySigner>) {
        let selected = signer.map(|s| Rc::new(s) as Rc<dyn Signer>);
        let listeners: Vec<_> = {
            let mut state = self.state.borrow_mut();
            state.selected = selected.clone();
            state.listeners.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for cb in listeners {
            cb(selected.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl Extension for MemoryExtension {
    fn on_selected_signer_changed(&self, callback: SignerCallback) -> DappResult<Subscription> {
        let callback: Rc<dyn Fn(Option<Rc<dyn Signer>>)> = Rc::from(callback);
        let (id, current) = {
            let mut state = self.state.borrow_mut();
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.push((id, callback.clone()));
            (id, state.selected.clone())
        };
        callback(current);
        let weak = Rc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().listeners.retain(|(i, _)| *i != id);
            }
        }))
    }
}

/// Gateway that either finds `extension` or reports it missing
#[derive(Clone)]
pub struct MemoryGateway {
    extension: Option<MemoryExtension>,
}

impl MemoryGateway {
    pub fn new(extension: MemoryExtension) -> Self {
        Self { extension: Some(extension) }
    }

    /// No extension installed
    pub fn missing() -> Self {
        Self { extension: None }
    }
}

#[async_trait(?Send)]
impl ExtensionGateway for MemoryGateway {
    async fn discover(&self, app_name: &str) -> DappResult<Rc<dyn Extension>> {
        match &self.extension {
            Some(ext) => {
                tracing::debug!(app = app_name, "memory extension authorized");
                Ok(Rc::new(ext.clone()) as Rc<dyn Extension>)
            }
            None => Err(DappError::ExtensionUnavailable("Install Reef Chain Wallet extension".into())),
        }
    }
}

//! External collaborators: the wallet extension and the signers it hands out.
//!
//! ```text
//! ExtensionGateway::discover(app) ──► Extension
//!                                        │ on_selected_signer_changed
//!                                        ▼
//!                                     Signer ── address / is_evm_claimed
//!                                            ── claim_evm_address
//!                                            ── subscribe_balance ──► Subscription
//! ```
//!
//! Everything runs on one thread (the browser event loop), so the traits are
//! `?Send` and signers are shared as `Rc<dyn Signer>`.

use async_trait::async_trait;
use std::fmt;
use std::rc::Rc;

use super::error::DappResult;

/// Receives raw free-balance values (smallest unit, decimal string)
pub type BalanceCallback = Box<dyn Fn(String)>;

/// Receives the newly selected signer; `None` when the extension has no visible account
pub type SignerCallback = Box<dyn Fn(Option<Rc<dyn Signer>>)>;

/// One chain account exposed by the extension
#[async_trait(?Send)]
pub trait Signer {
    /// Substrate address of the account
    async fn address(&self) -> DappResult<String>;

    /// Whether an EVM address has been bound to this account
    async fn is_evm_claimed(&self) -> DappResult<bool>;

    /// Submit the transaction that binds the default EVM address
    async fn claim_evm_address(&self) -> DappResult<()>;

    /// Stream free-balance updates into `on_balance` until the subscription is cancelled
    async fn subscribe_balance(&self, on_balance: BalanceCallback) -> DappResult<Subscription>;
}

/// A discovered wallet extension
pub trait Extension {
    fn on_selected_signer_changed(&self, callback: SignerCallback) -> DappResult<Subscription>;
}

/// Finds the wallet extension and asks it to authorize this DApp
#[async_trait(?Send)]
pub trait ExtensionGateway {
    async fn discover(&self, app_name: &str) -> DappResult<Rc<dyn Extension>>;
}

/// Live external subscription. Cancelled explicitly or on drop, exactly once.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// A subscription with nothing to tear down
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}

/// Identity comparison for shared signers (data pointer only, vtables may differ)
pub fn same_signer(a: &Rc<dyn Signer>, b: &Rc<dyn Signer>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn cancels_once_explicitly_or_on_drop() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let mut sub = Subscription::new(move || c.set(c.get() + 1));
        assert!(sub.is_active());
        sub.cancel();
        sub.cancel();
        assert!(!sub.is_active());
        drop(sub);
        assert_eq!(count.get(), 1);

        let c = count.clone();
        drop(Subscription::new(move || c.set(c.get() + 1)));
        assert_eq!(count.get(), 2);
    }
}

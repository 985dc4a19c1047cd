//! Reef wallet extension bindings
//!
//! | Rust | JS |
//! |------|----|
//! | `ReefGateway::discover` | `window.injectedWeb3.reef.enable(appName)` |
//! | `ReefExtension::on_selected_signer_changed` | `reefSigner.subscribeSelectedAccountSigner(cb)` |
//! | `ReefSigner::address` | `signer.getSubstrateAddress()` |
//! | `ReefSigner::is_evm_claimed` | `signer.isClaimed()` |
//! | `ReefSigner::claim_evm_address` | `signer.claimDefaultAccount()` |
//! | `ReefSigner::subscribe_balance` | `signer.provider.api.query.system.account(addr, cb)` |

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::core::error::{DappError, DappResult};
use crate::core::signer::{BalanceCallback, Extension, ExtensionGateway, Signer, SignerCallback, Subscription};

const INJECTED_WEB3: &str = "injectedWeb3";
const REEF_EXTENSION: &str = "reef";
const INSTALL_HINT: &str = "Install Reef Chain Wallet extension for Chrome or Firefox";

fn get(target: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
}

/// Walk `a.b.c`, failing on the first missing segment
fn get_path(target: &JsValue, path: &[&str]) -> Result<JsValue, JsValue> {
    let mut value = target.clone();
    for key in path {
        value = get(&value, key)?;
        if value.is_undefined() || value.is_null() {
            return Err(JsValue::from_str(&format!("missing '{}'", key)));
        }
    }
    Ok(value)
}

fn method(target: &JsValue, name: &str) -> Result<Function, JsValue> {
    get(target, name)?
        .dyn_into::<Function>()
        .map_err(|_| JsValue::from_str(&format!("'{}' is not a function", name)))
}

/// Call `target.name(...args)` and await the result if it is a promise
async fn call(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let f = method(target, name)?;
    let result = match args {
        [] => f.call0(target)?,
        [a] => f.call1(target, a)?,
        [a, b] => f.call2(target, a, b)?,
        _ => return Err(JsValue::from_str("too many arguments")),
    };
    JsFuture::from(Promise::resolve(&result)).await
}

/// Best-effort message from a thrown JS value
fn js_message(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| get(err, "message").ok().and_then(|m| m.as_string()))
        .unwrap_or_else(|| format!("{:?}", err))
}

fn to_js_string(value: &JsValue) -> Option<String> {
    if let Some(s) = value.as_string() {
        return Some(s);
    }
    method(value, "toString").ok()?.call0(value).ok()?.as_string()
}

fn signer_err(err: JsValue) -> DappError {
    DappError::Signer(js_message(&err))
}

/// Discovers the injected Reef extension
#[derive(Debug, Clone, Copy, Default)]
pub struct ReefGateway;

#[async_trait(?Send)]
impl ExtensionGateway for ReefGateway {
    async fn discover(&self, app_name: &str) -> DappResult<Rc<dyn Extension>> {
        let window: JsValue = web_sys::window()
            .ok_or_else(|| DappError::ExtensionUnavailable("no window".into()))?
            .into();
        let reef = get_path(&window, &[INJECTED_WEB3, REEF_EXTENSION])
            .map_err(|_| DappError::ExtensionUnavailable(INSTALL_HINT.into()))?;
        let injected = call(&reef, "enable", &[JsValue::from_str(app_name)])
            .await
            .map_err(|e| DappError::ExtensionUnavailable(js_message(&e)))?;
        Ok(Rc::new(ReefExtension { inner: injected }) as Rc<dyn Extension>)
    }
}

/// Authorized extension handle
pub struct ReefExtension {
    inner: JsValue,
}

impl Extension for ReefExtension {
    fn on_selected_signer_changed(&self, callback: SignerCallback) -> DappResult<Subscription> {
        let reef_signer = get_path(&self.inner, &["reefSigner"])
            .map_err(|_| DappError::ExtensionUnavailable("extension has no reefSigner".into()))?;
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |sig: JsValue| {
            let signer = if sig.is_null() || sig.is_undefined() {
                None
            } else {
                Some(Rc::new(ReefSigner { inner: sig }) as Rc<dyn Signer>)
            };
            callback(signer);
        });
        let unsubscribe = method(&reef_signer, "subscribeSelectedAccountSigner")
            .and_then(|f| f.call1(&reef_signer, closure.as_ref()))
            .map_err(|e| DappError::Subscription(js_message(&e)))?;
        Ok(Subscription::new(move || {
            if let Some(f) = unsubscribe.dyn_ref::<Function>() {
                let _ = f.call0(&JsValue::NULL);
            }
            drop(closure);
        }))
    }
}

/// `@reef-defi/evm-provider` Signer handed out by the extension
pub struct ReefSigner {
    inner: JsValue,
}

#[async_trait(?Send)]
impl Signer for ReefSigner {
    async fn address(&self) -> DappResult<String> {
        call(&self.inner, "getSubstrateAddress", &[])
            .await
            .map_err(signer_err)?
            .as_string()
            .ok_or_else(|| DappError::Signer("substrate address is not a string".into()))
    }

    async fn is_evm_claimed(&self) -> DappResult<bool> {
        call(&self.inner, "isClaimed", &[])
            .await
            .map_err(signer_err)?
            .as_bool()
            .ok_or_else(|| DappError::Signer("isClaimed did not return a boolean".into()))
    }

    async fn claim_evm_address(&self) -> DappResult<()> {
        call(&self.inner, "claimDefaultAccount", &[])
            .await
            .map(|_| ())
            .map_err(|e| DappError::Claim(js_message(&e)))
    }

    async fn subscribe_balance(&self, on_balance: BalanceCallback) -> DappResult<Subscription> {
        let address = self.address().await?;
        let system = get_path(&self.inner, &["provider", "api", "query", "system"])
            .map_err(|e| DappError::Subscription(js_message(&e)))?;
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |account: JsValue| {
            match get_path(&account, &["data", "free"]).ok().as_ref().and_then(to_js_string) {
                Some(free) => on_balance(free),
                None => web_sys::console::warn_1(&JsValue::from_str("[reefdapp] account update without data.free")),
            }
        });
        let unsubscribe = call(&system, "account", &[JsValue::from_str(&address), closure.as_ref().clone()])
            .await
            .map_err(|e| DappError::Subscription(js_message(&e)))?;
        Ok(Subscription::new(move || {
            if let Some(f) = unsubscribe.dyn_ref::<Function>() {
                let _ = f.call0(&JsValue::NULL);
            }
            drop(closure);
        }))
    }
}

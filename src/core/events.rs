//! DOM event vocabulary shared by the controller and the UI
//!
//! | Event | Direction | Detail |
//! |-------|-----------|--------|
//! | `bind-evm-address` | inbound | candidate address |
//! | `get-contract-value` | inbound | - |
//! | `toggle-contract-value` | inbound | - |
//! | `display-error` | outbound | markup string or `{message}` |
//! | `clear-error` | outbound | - |
//! | `signer-change` | outbound | address |
//! | `balance-value` | outbound | normalized balance |
//! | `evm-connected` | outbound | - |
//! | `dapp-connected` | outbound | - |
//! | `tx-progress` | outbound | - |
//! | `tx-complete` | outbound | - |

use serde::Serialize;
use serde_json::{json, Value};

use super::balance::Balance;
use super::error::DappError;

pub mod names {
    pub const BIND_EVM_ADDRESS: &str = "bind-evm-address";
    pub const GET_CONTRACT_VALUE: &str = "get-contract-value";
    pub const TOGGLE_CONTRACT_VALUE: &str = "toggle-contract-value";

    pub const DISPLAY_ERROR: &str = "display-error";
    pub const CLEAR_ERROR: &str = "clear-error";
    pub const SIGNER_CHANGE: &str = "signer-change";
    pub const BALANCE_VALUE: &str = "balance-value";
    pub const EVM_CONNECTED: &str = "evm-connected";
    pub const DAPP_CONNECTED: &str = "dapp-connected";
    pub const TX_PROGRESS: &str = "tx-progress";
    pub const TX_COMPLETE: &str = "tx-complete";

    pub const INBOUND: &[&str] = &[BIND_EVM_ADDRESS, GET_CONTRACT_VALUE, TOGGLE_CONTRACT_VALUE];
}

/// Payload of `display-error`. The UI renders markup as-is and objects by `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorNotice {
    Markup(String),
    Message { message: String },
}

impl ErrorNotice {
    pub fn message(text: impl Into<String>) -> Self {
        ErrorNotice::Message { message: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            ErrorNotice::Markup(s) => s,
            ErrorNotice::Message { message } => message,
        }
    }
}

impl From<&DappError> for ErrorNotice {
    fn from(err: &DappError) -> Self {
        ErrorNotice::message(err.to_string())
    }
}

/// Notifications the controller broadcasts to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum DappEvent {
    DisplayError(ErrorNotice),
    ClearError,
    SignerChange(String),
    BalanceValue(Balance),
    EvmConnected,
    DappConnected,
    TxProgress,
    TxComplete,
}

impl DappEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DappEvent::DisplayError(_) => names::DISPLAY_ERROR,
            DappEvent::ClearError => names::CLEAR_ERROR,
            DappEvent::SignerChange(_) => names::SIGNER_CHANGE,
            DappEvent::BalanceValue(_) => names::BALANCE_VALUE,
            DappEvent::EvmConnected => names::EVM_CONNECTED,
            DappEvent::DappConnected => names::DAPP_CONNECTED,
            DappEvent::TxProgress => names::TX_PROGRESS,
            DappEvent::TxComplete => names::TX_COMPLETE,
        }
    }

    /// `CustomEvent.detail`, or `None` for plain events
    pub fn detail(&self) -> Option<Value> {
        match self {
            DappEvent::DisplayError(notice) => Some(json!(notice)),
            DappEvent::SignerChange(address) => Some(json!(address)),
            DappEvent::BalanceValue(balance) => Some(json!(balance)),
            _ => None,
        }
    }

    /// `{"event": name, "detail": ...}` line used by the CLI
    pub fn to_json(&self) -> Value {
        match self.detail() {
            Some(detail) => json!({"event": self.name(), "detail": detail}),
            None => json!({"event": self.name()}),
        }
    }
}

/// Requests arriving from the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    BindEvmAddress(String),
    GetContractValue,
    ToggleContractValue,
}

impl InboundEvent {
    /// Build from a DOM event name and its string detail, if any
    pub fn parse(name: &str, detail: Option<String>) -> Option<Self> {
        match name {
            names::BIND_EVM_ADDRESS => Some(InboundEvent::BindEvmAddress(detail.unwrap_or_default())),
            names::GET_CONTRACT_VALUE => Some(InboundEvent::GetContractValue),
            names::TOGGLE_CONTRACT_VALUE => Some(InboundEvent::ToggleContractValue),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::BindEvmAddress(_) => names::BIND_EVM_ADDRESS,
            InboundEvent::GetContractValue => names::GET_CONTRACT_VALUE,
            InboundEvent::ToggleContractValue => names::TOGGLE_CONTRACT_VALUE,
        }
    }
}

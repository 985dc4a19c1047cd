//! Errors surfaced by the DApp. All of them end up as a `display-error` notice.

use thiserror::Error;

/// Result alias for controller and collaborator operations
pub type DappResult<T> = Result<T, DappError>;

/// Raw balance could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("empty balance value")]
    Empty,
    #[error("balance '{0}' is not a decimal integer")]
    NotInteger(String),
    #[error("balance '{0}' does not fit in 128 bits")]
    Overflow(String),
    #[error("unsupported token decimals: {0}")]
    Decimals(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DappError {
    /// EVM bind was requested for an address that is not the selected signer
    #[error("Error connecting EVM. Selected signer is not the same.")]
    SignerMismatch { selected: String, requested: String },

    #[error("No signer selected")]
    NoSigner,

    #[error("Create account in Reef extension or make selected account visible.")]
    NoSelectedAccount,

    #[error("Reef extension unavailable: {0}")]
    ExtensionUnavailable(String),

    #[error("Balance subscription failed: {0}")]
    Subscription(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("EVM claim failed: {0}")]
    Claim(String),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

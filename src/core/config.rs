//! DApp Configuration - passed from higher layers

use super::error::{DappError, DappResult};

/// Largest fractional-unit exponent we normalize (10^30 still leaves headroom in u128)
pub const MAX_DECIMALS: u32 = 30;

pub const DEFAULT_APP_NAME: &str = "Minimal DApp Example";
pub const REEF_DECIMALS: u32 = 18;
pub const DEFAULT_FUNDING_THRESHOLD: u64 = 3;
pub const REEF_SYMBOL: &str = "REEF";
pub const REEF_FAUCET_URL: &str = "https://app.element.io/#/room/#reef:matrix.org";

/// DApp configuration. Higher layers construct this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DappConfig {
    /// Name announced to the wallet extension on discovery
    pub app_name: String,
    /// Fractional-unit exponent of the token (raw / 10^decimals)
    pub decimals: u32,
    /// Whole-token balance below which an unclaimed signer is asked to fund itself
    pub funding_threshold: u64,
    pub token_symbol: String,
    pub faucet_url: String,
}

impl Default for DappConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.into(),
            decimals: REEF_DECIMALS,
            funding_threshold: DEFAULT_FUNDING_THRESHOLD,
            token_symbol: REEF_SYMBOL.into(),
            faucet_url: REEF_FAUCET_URL.into(),
        }
    }
}

impl DappConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self { app_name: app_name.into(), ..Default::default() }
    }
    pub fn with_decimals(mut self, decimals: u32) -> Self { self.decimals = decimals; self }
    pub fn with_funding_threshold(mut self, units: u64) -> Self { self.funding_threshold = units; self }
    pub fn with_token_symbol(mut self, symbol: impl Into<String>) -> Self { self.token_symbol = symbol.into(); self }
    pub fn with_faucet_url(mut self, url: impl Into<String>) -> Self { self.faucet_url = url.into(); self }

    pub fn validate(&self) -> DappResult<()> {
        if self.app_name.trim().is_empty() {
            return Err(DappError::Config("app name must not be empty".into()));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(DappError::Config(format!(
                "decimals {} exceeds maximum of {}",
                self.decimals, MAX_DECIMALS
            )));
        }
        Ok(())
    }

    /// Markup shown while an unclaimed signer cannot pay the claim fee
    pub fn funding_advisory(&self, address: &str) -> String {
        format!(
            "<p>To enable contract interaction you need to sign transaction with ~{threshold}{symbol} fee.<br/>\
             To get 1000 testnet {symbol} simply type:<br/> <code>!drip {address}</code> <br/>\
             in <a href=\"{faucet}\" target=\"_blank\">Reef matrix chat</a>. <br/>\
             Listening on chain for balance update.</p>",
            threshold = self.funding_threshold,
            symbol = self.token_symbol,
            address = address,
            faucet = self.faucet_url,
        )
    }
}

//! Balance normalization: raw smallest-unit integers → human-scale decimals.
//!
//! Exact integer arithmetic only. A REEF balance of `2000000000000000000`
//! with 18 decimals normalizes to `2`.

use serde::{Serialize, Serializer};
use std::fmt;

use super::config::MAX_DECIMALS;
use super::error::BalanceError;

/// A token balance: raw amount plus the fractional-unit exponent it is scaled by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    raw: u128,
    decimals: u32,
}

impl Balance {
    pub fn new(raw: u128, decimals: u32) -> Result<Self, BalanceError> {
        if decimals > MAX_DECIMALS {
            return Err(BalanceError::Decimals(decimals));
        }
        Ok(Self { raw, decimals })
    }

    /// Parse a raw decimal integer string as delivered by the chain
    pub fn from_raw(raw: &str, decimals: u32) -> Result<Self, BalanceError> {
        let digits = raw.trim();
        if digits.is_empty() {
            return Err(BalanceError::Empty);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BalanceError::NotInteger(digits.to_string()));
        }
        let value = digits
            .parse::<u128>()
            .map_err(|_| BalanceError::Overflow(digits.to_string()))?;
        Self::new(value, decimals)
    }

    pub fn raw(&self) -> u128 { self.raw }
    pub fn decimals(&self) -> u32 { self.decimals }

    fn unit(&self) -> u128 {
        10u128.pow(self.decimals)
    }

    /// Whole-token part of the balance
    pub fn whole(&self) -> u128 {
        self.raw / self.unit()
    }

    /// True when the balance is strictly below `units` whole tokens
    pub fn is_below(&self, units: u64) -> bool {
        match (units as u128).checked_mul(self.unit()) {
            Some(limit) => self.raw < limit,
            // threshold exceeds every representable raw balance
            None => true,
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.whole();
        let frac = self.raw % self.unit();
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let padded = format!("{:0width$}", frac, width = self.decimals as usize);
        write!(f, "{}.{}", whole, padded.trim_end_matches('0'))
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Core chain types for the ATM client
///
/// Addresses, hashes and 256-bit integers come from `alloy-primitives`.
/// This module adds the ether [`Amount`] shown to the user and the
/// request/receipt shapes exchanged with a wallet provider.
use crate::errors::{AtmError, AtmResult};
use alloy_primitives::utils::{format_ether, parse_ether};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use alloy_primitives::{Address, Bytes, TxHash, U256};

/// Represents an amount of ether
///
/// Held in wei as a full `uint256`, so every value the contract can store
/// round-trips without loss.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount {
    wei: U256,
}

impl Amount {
    /// Number of decimal places for ether
    pub const DECIMALS: usize = 18;
    /// Wei per ether (10^18)
    pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

    pub const ZERO: Amount = Amount { wei: U256::ZERO };

    pub fn from_wei(wei: U256) -> Self {
        Amount { wei }
    }

    /// Create amount from whole ether
    pub fn from_ether(ether: u64) -> Self {
        Amount {
            wei: U256::from(ether) * Self::WEI_PER_ETHER,
        }
    }

    /// Create amount from a decimal ether string such as `"1.25"`.
    ///
    /// Surrounding whitespace is ignored, as are a leading or trailing
    /// decimal point (`".5"`, `"1."`). Signs, exponents and more than
    /// eighteen fractional digits are rejected.
    pub fn from_string(amount_str: &str) -> AtmResult<Self> {
        let amount_str = amount_str.trim();
        if amount_str.is_empty() {
            return Err(AtmError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        let (whole_str, fractional_str) = amount_str.split_once('.').unwrap_or((amount_str, ""));
        if whole_str.is_empty() && fractional_str.is_empty() {
            return Err(AtmError::InvalidAmount(
                "Invalid number format".to_string(),
            ));
        }

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole_str) || !all_digits(fractional_str) {
            return Err(AtmError::InvalidAmount(
                "Invalid number format".to_string(),
            ));
        }

        if fractional_str.len() > Self::DECIMALS {
            return Err(AtmError::InvalidAmount(
                "Too many decimal places".to_string(),
            ));
        }

        let whole_str = if whole_str.is_empty() { "0" } else { whole_str };
        let normalized = if fractional_str.is_empty() {
            whole_str.to_string()
        } else {
            format!("{}.{}", whole_str, fractional_str)
        };

        parse_ether(&normalized)
            .map(Self::from_wei)
            .map_err(|e| AtmError::InvalidAmount(format!("Amount out of range: {}", e)))
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }

    /// Full-precision ether string without trailing zeros, e.g. `"3"` or `"2.5"`.
    pub fn as_string(&self) -> String {
        let formatted = format_ether(self.wei);
        if formatted.contains('.') {
            formatted
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            formatted
        }
    }

    /// Ether string that always carries a fractional part, e.g. `"3.0"`.
    pub fn to_ether_string(&self) -> String {
        let plain = self.as_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    }

    pub fn checked_add(&self, other: &Amount) -> AtmResult<Amount> {
        self.wei
            .checked_add(other.wei)
            .map(Amount::from_wei)
            .ok_or_else(|| AtmError::InvalidAmount("Amount overflow in addition".to_string()))
    }

    pub fn checked_sub(&self, other: &Amount) -> AtmResult<Amount> {
        self.wei
            .checked_sub(other.wei)
            .map(Amount::from_wei)
            .ok_or_else(|| {
                AtmError::InvalidAmount("Insufficient amount for subtraction".to_string())
            })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.to_ether_string())
    }
}

impl FromStr for Amount {
    type Err = AtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::from_string(s)
    }
}

/// A contract call addressed from the signer to the contract.
///
/// Serializes as the JSON-RPC transaction object (`{from, to, data}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// Inclusion receipt for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

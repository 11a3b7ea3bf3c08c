//! Mirror of the contract balance into local display state.

use chrono::{DateTime, Utc};

use crate::blockchain::{Address, Amount};
use crate::contract::ContractHandle;
use crate::errors::AtmResult;

/// Last successful balance read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub amount: Amount,
    /// Signer the balance was read as; snapshots for another account are stale.
    pub account: Address,
    pub read_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(amount: Amount, account: Address) -> Self {
        Self {
            amount,
            account,
            read_at: Utc::now(),
        }
    }

    /// Balance in ether, e.g. `"2.5"`.
    pub fn formatted(&self) -> String {
        self.amount.to_ether_string()
    }
}

/// Read the balance through `handle`. Read-only; nothing is signed.
pub async fn refresh(handle: &ContractHandle) -> AtmResult<BalanceSnapshot> {
    let amount = handle.balance().await?;
    log::debug!("Balance for {} is {}", handle.signer(), amount);
    Ok(BalanceSnapshot::new(amount, handle.signer()))
}

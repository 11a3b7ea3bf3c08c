//! Deposit and withdraw submission.
//!
//! Both operations run through [`execute`]; only the bound contract function
//! and the status wording differ by [`TxKind`]. Gating on the processing flag
//! and publishing outcomes happen in the reducer (`app_state::update`).

use crate::blockchain::Receipt;
use crate::contract::{ContractHandle, TxKind};
use crate::errors::{AtmError, AtmResult};
use crate::validation::InputValidator;

/// Parse `raw_amount`, send `kind(amount)` as the handle's signer and wait
/// for inclusion.
///
/// A malformed amount fails before anything reaches the provider.
pub async fn execute(
    handle: &ContractHandle,
    kind: TxKind,
    raw_amount: &str,
    validator: &InputValidator,
) -> AtmResult<Receipt> {
    let amount = validator.parse_amount(raw_amount).map_err(|e| {
        log::debug!("{} amount {:?} rejected: {}", kind, raw_amount, e);
        e
    })?;

    let pending = handle.submit(kind, amount).await?;
    let receipt = pending.wait().await?;
    log::info!(
        "{} confirmed in block {:?} ({})",
        kind,
        receipt.block_number,
        receipt.transaction_hash
    );
    Ok(receipt)
}

pub fn processing_message(kind: TxKind) -> String {
    format!("Processing {}...", kind.noun())
}

pub fn success_message(kind: TxKind) -> String {
    format!("{} successful!", capitalized(kind))
}

/// Failure text naming the operation and its most likely cause.
pub fn failure_message(kind: TxKind, error: &AtmError) -> String {
    if error.is_input_error() {
        return format!(
            "{} failed. Please enter a valid amount and try again.",
            capitalized(kind)
        );
    }
    match kind {
        TxKind::Deposit => {
            "Deposit failed. Please ensure you have sufficient funds and try again.".to_string()
        }
        TxKind::Withdraw => {
            "Withdrawal failed. Please ensure you have sufficient balance and try again."
                .to_string()
        }
    }
}

fn capitalized(kind: TxKind) -> &'static str {
    match kind {
        TxKind::Deposit => "Deposit",
        TxKind::Withdraw => "Withdrawal",
    }
}

//! Account authorization against the wallet provider.
//!
//! Only the first authorized account is ever used.

use crate::blockchain::Address;
use crate::errors::AtmResult;
use crate::provider::WalletProvider;

/// Accounts already granted to this client, queried without a prompt.
///
/// Provider failures are logged and treated as "no account" so a silent
/// startup check never surfaces an error.
pub async fn read_authorized_accounts(provider: &dyn WalletProvider) -> Option<Address> {
    match provider.accounts().await {
        Ok(accounts) => first_account(accounts),
        Err(e) => {
            log::warn!("Reading authorized accounts failed: {}", e);
            None
        }
    }
}

/// Ask the wallet to authorize an account. Only call this from an explicit
/// user action; it may open a wallet prompt.
pub async fn request_accounts(provider: &dyn WalletProvider) -> AtmResult<Option<Address>> {
    let accounts = provider.request_accounts().await?;
    Ok(first_account(accounts))
}

fn first_account(accounts: Vec<Address>) -> Option<Address> {
    if accounts.len() > 1 {
        log::debug!(
            "{} accounts authorized, using the first",
            accounts.len()
        );
    }
    accounts.into_iter().next()
}

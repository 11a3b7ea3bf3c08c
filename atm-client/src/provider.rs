//! Wallet provider capability and host-environment detection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::blockchain::{Address, Bytes, CallRequest, Receipt, TxHash};
use crate::blockchain_client::RpcClient;
use crate::config_store::NetworkConfig;
use crate::errors::AtmResult;

/// Interval between receipt polls when a provider does not choose its own.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shown for the whole session when no provider is injected.
pub const NO_WALLET_MESSAGE: &str =
    "No wallet provider detected. Please configure a wallet endpoint to use this ATM.";

/// Capability handed to the ATM by the host environment.
///
/// Mirrors the EIP-1193 request surface. All calls may fail; callers decide
/// whether a failure is surfaced or treated as "nothing returned".
#[async_trait]
pub trait WalletProvider: Send + Sync + fmt::Debug {
    /// Accounts already authorized for this client, without prompting.
    async fn accounts(&self) -> AtmResult<Vec<Address>>;

    /// Ask the wallet to authorize accounts; may show a prompt.
    async fn request_accounts(&self) -> AtmResult<Vec<Address>>;

    /// Read-only contract call, returning the raw ABI output.
    async fn call(&self, request: &CallRequest) -> AtmResult<Bytes>;

    /// Signed contract call, returning the pending transaction hash.
    async fn send_transaction(&self, request: &CallRequest) -> AtmResult<TxHash>;

    /// Receipt for `hash`, or `None` while the transaction is pending.
    async fn transaction_receipt(&self, hash: &TxHash) -> AtmResult<Option<Receipt>>;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }
}

/// Source of an injected wallet provider.
pub trait HostEnvironment {
    fn injected_provider(&self) -> Option<Arc<dyn WalletProvider>>;
}

/// Inspect the host once for a wallet provider.
pub fn detect(host: &dyn HostEnvironment) -> Option<Arc<dyn WalletProvider>> {
    let provider = host.injected_provider();
    match &provider {
        Some(provider) => log::info!("Wallet provider detected: {:?}", provider),
        None => log::warn!("No wallet provider detected"),
    }
    provider
}

/// Host backed by a configured JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcHost {
    network: NetworkConfig,
}

impl RpcHost {
    pub fn new(network: NetworkConfig) -> Self {
        Self { network }
    }
}

impl HostEnvironment for RpcHost {
    fn injected_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        let endpoint = self.network.endpoint.as_deref()?.trim();
        if endpoint.is_empty() {
            return None;
        }

        match RpcClient::new(
            endpoint,
            self.network.request_timeout(),
            self.network.poll_interval(),
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                log::warn!("Wallet endpoint {} unusable: {}", endpoint, e);
                None
            }
        }
    }
}

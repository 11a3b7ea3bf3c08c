//! Contract interface descriptor and account-bound contract handle.
//!
//! The descriptor knows three entry points: a no-argument balance read and
//! two single-`uint256` signed calls. The default surface is declared with
//! `sol!`; names taken from configuration or a Hardhat artifact get their
//! selectors from `keccak256` of the rebuilt signature.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::keccak256;
use alloy_sol_types::{sol, SolCall, SolValue};
use serde::Deserialize;

use crate::blockchain::{Address, Amount, Bytes, CallRequest, Receipt, TxHash, U256};
use crate::config_store::ContractConfig;
use crate::errors::{AtmError, AtmResult};
use crate::provider::WalletProvider;

sol! {
    /// Default ATM contract surface.
    interface IAtm {
        function getBalance() external view returns (uint256);
        function deposit(uint256 amount) external;
        function withdraw(uint256 amount) external;
    }
}

/// The two value-changing operations the contract exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Deposit,
    Withdraw,
}

impl TxKind {
    pub const ALL: [TxKind; 2] = [TxKind::Deposit, TxKind::Withdraw];

    /// Noun used in status messages ("deposit", "withdrawal").
    pub fn noun(&self) -> &'static str {
        match self {
            TxKind::Deposit => "deposit",
            TxKind::Withdraw => "withdrawal",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Deposit => write!(f, "Deposit"),
            TxKind::Withdraw => write!(f, "Withdraw"),
        }
    }
}

/// One contract entry point, identified by its canonical signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFunction {
    signature: String,
    selector: [u8; 4],
}

impl ContractFunction {
    pub fn new(signature: impl Into<String>) -> Self {
        let signature = signature.into();
        let digest = keccak256(signature.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&digest[..4]);
        Self {
            signature,
            selector,
        }
    }

    /// Function declared through `sol!`.
    pub fn of<C: SolCall>() -> Self {
        Self {
            signature: C::SIGNATURE.to_string(),
            selector: C::SELECTOR,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Selector followed by each `uint256` argument as one ABI word.
    pub fn encode_call(&self, args: &[U256]) -> Bytes {
        let mut data = self.selector.to_vec();
        for arg in args {
            data.extend_from_slice(&arg.abi_encode());
        }
        Bytes::from(data)
    }
}

/// Fixed description of the contract's balance, deposit and withdraw calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    balance: ContractFunction,
    deposit: ContractFunction,
    withdraw: ContractFunction,
}

impl Default for InterfaceDescriptor {
    fn default() -> Self {
        Self {
            balance: ContractFunction::of::<IAtm::getBalanceCall>(),
            deposit: ContractFunction::of::<IAtm::depositCall>(),
            withdraw: ContractFunction::of::<IAtm::withdrawCall>(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AbiParam {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
}

/// Either a Hardhat artifact (`{"abi": [...]}`) or a bare ABI array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtifactFile {
    Artifact { abi: Vec<AbiEntry> },
    Abi(Vec<AbiEntry>),
}

impl InterfaceDescriptor {
    /// Descriptor assuming the conventional `name()` / `name(uint256)` shapes.
    pub fn from_names(balance: &str, deposit: &str, withdraw: &str) -> Self {
        Self {
            balance: ContractFunction::new(format!("{}()", balance)),
            deposit: ContractFunction::new(format!("{}(uint256)", deposit)),
            withdraw: ContractFunction::new(format!("{}(uint256)", withdraw)),
        }
    }

    /// Build from configuration: the artifact ABI when one is configured,
    /// otherwise the configured function names.
    pub fn from_config(config: &ContractConfig) -> AtmResult<Self> {
        match &config.artifact_path {
            Some(path) => Self::from_artifact(path, config),
            None => Ok(Self::from_names(
                &config.balance_function,
                &config.deposit_function,
                &config.withdraw_function,
            )),
        }
    }

    /// Load a Hardhat artifact and resolve the configured function names.
    pub fn from_artifact(path: impl AsRef<Path>, config: &ContractConfig) -> AtmResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let descriptor = Self::from_abi_json(&text, config).map_err(|e| {
            AtmError::ConfigError(format!("Artifact {}: {}", path.display(), e))
        })?;
        log::info!(
            "Loaded contract interface from {} ({}, {}, {})",
            path.display(),
            descriptor.balance.signature(),
            descriptor.deposit.signature(),
            descriptor.withdraw.signature()
        );
        Ok(descriptor)
    }

    /// Resolve functions from artifact or ABI JSON text.
    pub fn from_abi_json(text: &str, config: &ContractConfig) -> AtmResult<Self> {
        let abi = match serde_json::from_str::<ArtifactFile>(text)? {
            ArtifactFile::Artifact { abi } => abi,
            ArtifactFile::Abi(abi) => abi,
        };

        Ok(Self {
            balance: resolve_function(&abi, &config.balance_function, 0)?,
            deposit: resolve_function(&abi, &config.deposit_function, 1)?,
            withdraw: resolve_function(&abi, &config.withdraw_function, 1)?,
        })
    }

    pub fn balance_function(&self) -> &ContractFunction {
        &self.balance
    }

    pub fn mutating_function(&self, kind: TxKind) -> &ContractFunction {
        match kind {
            TxKind::Deposit => &self.deposit,
            TxKind::Withdraw => &self.withdraw,
        }
    }
}

fn resolve_function(abi: &[AbiEntry], name: &str, arity: usize) -> AtmResult<ContractFunction> {
    let entry = abi
        .iter()
        .filter(|entry| entry.kind == "function" && entry.name.as_deref() == Some(name))
        .find(|entry| entry.inputs.len() == arity)
        .ok_or_else(|| {
            AtmError::ConfigError(format!(
                "ABI has no function '{}' taking {} argument(s)",
                name, arity
            ))
        })?;

    let params: Vec<&str> = entry.inputs.iter().map(|p| p.kind.as_str()).collect();
    Ok(ContractFunction::new(format!("{}({})", name, params.join(","))))
}

/// A transaction that was signed and sent but is not yet confirmed.
#[derive(Debug)]
pub struct PendingTransaction {
    hash: TxHash,
    provider: Arc<dyn WalletProvider>,
    poll_interval: Duration,
}

impl PendingTransaction {
    /// Wait until the provider reports the transaction included.
    ///
    /// There is no timeout: this resolves only when a receipt appears or the
    /// provider errors. A receipt with failed status is `Reverted`.
    pub async fn wait(self) -> AtmResult<Receipt> {
        loop {
            match self.provider.transaction_receipt(&self.hash).await? {
                Some(receipt) if receipt.success => return Ok(receipt),
                Some(receipt) => {
                    return Err(AtmError::Reverted(format!(
                        "transaction {} failed in block {}",
                        receipt.transaction_hash,
                        receipt
                            .block_number
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| "?".to_string())
                    )))
                }
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

/// Contract bound to one signer account.
///
/// Derived state: a new handle is built whenever the account changes, never
/// re-pointed in place.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    address: Address,
    descriptor: Arc<InterfaceDescriptor>,
    signer: Address,
    provider: Arc<dyn WalletProvider>,
}

/// Pair `provider` and `account` with the contract. No network traffic.
pub fn bind(
    provider: Arc<dyn WalletProvider>,
    account: Address,
    address: Address,
    descriptor: Arc<InterfaceDescriptor>,
) -> ContractHandle {
    log::info!("Binding contract {} to signer {}", address, account);
    ContractHandle {
        address,
        descriptor,
        signer: account,
        provider,
    }
}

impl ContractHandle {
    pub fn signer(&self) -> Address {
        self.signer
    }

    /// Read the contract balance through `eth_call`.
    pub async fn balance(&self) -> AtmResult<Amount> {
        let request = CallRequest {
            from: self.signer,
            to: self.address,
            data: self.descriptor.balance_function().encode_call(&[]),
        };
        let output = self.provider.call(&request).await?;
        let wei = U256::abi_decode(&output).map_err(|e| {
            AtmError::InvalidResponse(format!("Undecodable balance output: {}", e))
        })?;
        Ok(Amount::from_wei(wei))
    }

    /// Sign and send `kind(amount)`, returning the pending transaction.
    pub async fn submit(&self, kind: TxKind, amount: Amount) -> AtmResult<PendingTransaction> {
        let request = CallRequest {
            from: self.signer,
            to: self.address,
            data: self
                .descriptor
                .mutating_function(kind)
                .encode_call(&[amount.wei()]),
        };
        let hash = self.provider.send_transaction(&request).await?;
        log::info!("{} of {} sent as {}", kind, amount, hash);
        Ok(PendingTransaction {
            hash,
            provider: Arc::clone(&self.provider),
            poll_interval: self.provider.poll_interval(),
        })
    }
}

//! In-memory wallet provider for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_sol_types::SolValue;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::blockchain::{Address, Amount, Bytes, CallRequest, Receipt, TxHash, U256};
use crate::contract::{self, ContractHandle, InterfaceDescriptor, TxKind};
use crate::errors::{AtmError, AtmResult};
use crate::provider::WalletProvider;

pub const ACCOUNT_A: Address = Address::new([0xaa; 20]);
pub const ACCOUNT_B: Address = Address::new([0xbb; 20]);
pub const CONTRACT: Address = Address::new([0xcc; 20]);

#[derive(Debug, Default)]
struct MockState {
    balance: Amount,
    authorized: Vec<Address>,
    grant_on_request: Vec<Address>,
    reject_request: bool,
    fail_reads: bool,
    reject_signing: bool,
    hold_confirmations: bool,
    pending: HashMap<TxHash, (TxKind, Amount)>,
    sent: Vec<CallRequest>,
    balance_reads: usize,
    account_requests: usize,
    nonce: u64,
}

/// Shared-state mock; clones observe the same chain.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn with_balance(ether: &str) -> Self {
        let provider = Self::default();
        provider.state.lock().balance = Amount::from_string(ether).unwrap();
        provider
    }

    pub fn with_wei(wei: U256) -> Self {
        let provider = Self::default();
        provider.state.lock().balance = Amount::from_wei(wei);
        provider
    }

    pub fn authorize(&self, account: Address) {
        self.state.lock().authorized.push(account);
    }

    pub fn grant_on_request(&self, account: Address) {
        self.state.lock().grant_on_request.push(account);
    }

    pub fn reject_requests(&self) {
        self.state.lock().reject_request = true;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn reject_signing(&self) {
        self.state.lock().reject_signing = true;
    }

    pub fn hold_confirmations(&self, hold: bool) {
        self.state.lock().hold_confirmations = hold;
    }

    pub fn sent(&self) -> Vec<CallRequest> {
        self.state.lock().sent.clone()
    }

    pub fn balance(&self) -> Amount {
        self.state.lock().balance
    }

    pub fn balance_reads(&self) -> usize {
        self.state.lock().balance_reads
    }

    pub fn account_requests(&self) -> usize {
        self.state.lock().account_requests
    }

    pub fn shared(&self) -> Arc<dyn WalletProvider> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn accounts(&self) -> AtmResult<Vec<Address>> {
        Ok(self.state.lock().authorized.clone())
    }

    async fn request_accounts(&self) -> AtmResult<Vec<Address>> {
        let mut state = self.state.lock();
        state.account_requests += 1;
        if state.reject_request {
            return Err(AtmError::UserRejected("User rejected the request.".into()));
        }
        let granted = state.grant_on_request.clone();
        state.authorized.extend(granted.iter().copied());
        Ok(granted)
    }

    async fn call(&self, request: &CallRequest) -> AtmResult<Bytes> {
        let mut state = self.state.lock();
        state.balance_reads += 1;
        if state.fail_reads {
            return Err(AtmError::NetworkError("connection refused".into()));
        }
        let descriptor = InterfaceDescriptor::default();
        if request.data[..] != descriptor.balance_function().selector()[..] {
            return Err(AtmError::Reverted("unknown selector".into()));
        }
        Ok(Bytes::from(state.balance.wei().abi_encode()))
    }

    async fn send_transaction(&self, request: &CallRequest) -> AtmResult<TxHash> {
        let mut state = self.state.lock();
        if state.reject_signing {
            return Err(AtmError::UserRejected(
                "User denied transaction signature.".into(),
            ));
        }
        let descriptor = InterfaceDescriptor::default();
        let kind = TxKind::ALL
            .into_iter()
            .find(|kind| request.data[..4] == descriptor.mutating_function(*kind).selector())
            .ok_or_else(|| AtmError::Reverted("unknown selector".into()))?;
        let amount = U256::abi_decode(&request.data[4..])
            .map(Amount::from_wei)
            .map_err(|e| AtmError::Reverted(e.to_string()))?;

        state.nonce += 1;
        let mut raw = [0u8; 32];
        raw[24..].copy_from_slice(&state.nonce.to_be_bytes());
        let hash = TxHash::new(raw);
        state.pending.insert(hash, (kind, amount));
        state.sent.push(request.clone());
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> AtmResult<Option<Receipt>> {
        let mut state = self.state.lock();
        if state.hold_confirmations {
            return Ok(None);
        }
        let (kind, amount) = match state.pending.remove(hash) {
            Some(entry) => entry,
            None => return Err(AtmError::ProviderError("unknown transaction".into())),
        };
        let applied = match kind {
            TxKind::Deposit => state.balance.checked_add(&amount),
            TxKind::Withdraw => state.balance.checked_sub(&amount),
        };
        let success = match applied {
            Ok(balance) => {
                state.balance = balance;
                true
            }
            Err(_) => false,
        };
        Ok(Some(Receipt {
            transaction_hash: *hash,
            block_number: Some(state.nonce),
            success,
        }))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(1)
    }
}

/// Handle for [`ACCOUNT_A`] against [`CONTRACT`] with the default interface.
pub fn bound_handle(provider: &MockProvider) -> ContractHandle {
    contract::bind(
        provider.shared(),
        ACCOUNT_A,
        CONTRACT,
        Arc::new(InterfaceDescriptor::default()),
    )
}

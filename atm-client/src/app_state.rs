//! Application state and its single transition function.
//!
//! Every change goes through [`update`], which returns the next state plus
//! the side effects the controller must run. Effects come back as new
//! [`Msg`] values, so the state is never mutated from inside an await.

use std::sync::Arc;

use crate::balance::BalanceSnapshot;
use crate::blockchain::{Address, Receipt};
use crate::contract::{self, ContractHandle, InterfaceDescriptor, TxKind};
use crate::errors::AtmError;
use crate::executor;
use crate::provider::{WalletProvider, NO_WALLET_MESSAGE};

pub const CONNECTING_MESSAGE: &str = "Connecting wallet...";
pub const CONNECTED_MESSAGE: &str = "Wallet connected.";
pub const CONNECT_FAILED_MESSAGE: &str = "Failed to connect wallet. Please try again.";
pub const NO_ACCOUNT_MESSAGE: &str = "No connected account found. Please connect your wallet.";
pub const BALANCE_FAILED_MESSAGE: &str = "Error fetching balance. Please try again.";

#[derive(Debug, Clone)]
pub enum WalletStatus {
    Detecting,
    Absent,
    Present(Arc<dyn WalletProvider>),
}

/// Deployed contract the session binds to once an account is known.
#[derive(Debug, Clone)]
pub struct ContractTarget {
    pub address: Address,
    pub descriptor: Arc<InterfaceDescriptor>,
}

impl ContractTarget {
    pub fn new(address: Address, descriptor: InterfaceDescriptor) -> Self {
        Self {
            address,
            descriptor: Arc::new(descriptor),
        }
    }
}

/// Raw text of the two amount inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountInputs {
    deposit: String,
    withdraw: String,
}

impl AmountInputs {
    pub fn get(&self, kind: TxKind) -> &str {
        match kind {
            TxKind::Deposit => &self.deposit,
            TxKind::Withdraw => &self.withdraw,
        }
    }

    fn slot(&mut self, kind: TxKind) -> &mut String {
        match kind {
            TxKind::Deposit => &mut self.deposit,
            TxKind::Withdraw => &mut self.withdraw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Detecting,
    NoWallet,
    Unauthenticated,
    /// Account known, contract handle not yet bound.
    Binding,
    Ready,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub wallet: WalletStatus,
    pub account: Option<Address>,
    pub handle: Option<ContractHandle>,
    pub balance: Option<BalanceSnapshot>,
    pub inputs: AmountInputs,
    pub status: Option<String>,
    /// Bumped on every status write, including rewrites of the same text.
    pub status_revision: u64,
    pub processing: bool,
    /// An account request is waiting on the wallet.
    pub connecting: bool,
    pub target: ContractTarget,
}

impl AppState {
    pub fn new(target: ContractTarget) -> Self {
        Self {
            wallet: WalletStatus::Detecting,
            account: None,
            handle: None,
            balance: None,
            inputs: AmountInputs::default(),
            status: None,
            status_revision: 0,
            processing: false,
            connecting: false,
            target,
        }
    }

    pub fn phase(&self) -> Phase {
        match (&self.wallet, self.account, &self.handle) {
            (WalletStatus::Detecting, _, _) => Phase::Detecting,
            (WalletStatus::Absent, _, _) => Phase::NoWallet,
            (WalletStatus::Present(_), None, _) => Phase::Unauthenticated,
            (WalletStatus::Present(_), Some(_), None) => Phase::Binding,
            (WalletStatus::Present(_), Some(_), Some(_)) => Phase::Ready,
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        match &self.wallet {
            WalletStatus::Present(provider) => Some(provider),
            _ => None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
        self.status_revision += 1;
    }
}

#[derive(Debug, Clone)]
pub enum Msg {
    WalletDetected(Option<Arc<dyn WalletProvider>>),
    ConnectRequested,
    AccountsResolved(Option<Address>),
    ConnectFailed(AtmError),
    AmountEdited(TxKind, String),
    SubmitRequested(TxKind),
    TxConfirmed(TxKind, Receipt),
    TxFailed(TxKind, AtmError),
    /// The submission future ended without reporting an outcome.
    SubmissionAbandoned(TxKind),
    BalanceLoaded(BalanceSnapshot),
    BalanceFailed(AtmError),
}

#[derive(Debug, Clone)]
pub enum Effect {
    ReadAuthorizedAccounts(Arc<dyn WalletProvider>),
    RequestAccounts(Arc<dyn WalletProvider>),
    RefreshBalance(ContractHandle),
    Submit {
        handle: ContractHandle,
        kind: TxKind,
        raw_amount: String,
    },
}

pub fn update(state: &AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match msg {
        Msg::WalletDetected(detected) => {
            if !matches!(state.wallet, WalletStatus::Detecting) {
                log::debug!("Ignoring repeated wallet detection");
                return (next, effects);
            }
            match detected {
                Some(provider) => {
                    next.wallet = WalletStatus::Present(provider.clone());
                    effects.push(Effect::ReadAuthorizedAccounts(provider));
                }
                None => {
                    next.wallet = WalletStatus::Absent;
                    next.set_status(NO_WALLET_MESSAGE);
                }
            }
        }

        Msg::ConnectRequested => {
            if state.connecting {
                log::debug!("Connect ignored, an account request is in flight");
                return (next, effects);
            }
            if let (Some(provider), None) = (state.provider(), state.account) {
                next.connecting = true;
                next.set_status(CONNECTING_MESSAGE);
                effects.push(Effect::RequestAccounts(provider.clone()));
            }
        }

        Msg::AccountsResolved(None) => {
            next.connecting = false;
            next.account = None;
            next.handle = None;
            next.balance = None;
            next.set_status(NO_ACCOUNT_MESSAGE);
        }

        Msg::AccountsResolved(Some(account)) => {
            next.connecting = false;
            let Some(provider) = state.provider() else {
                return (next, effects);
            };
            if state.account == Some(account) && state.handle.is_some() {
                return (next, effects);
            }
            let handle = contract::bind(
                provider.clone(),
                account,
                state.target.address,
                state.target.descriptor.clone(),
            );
            next.account = Some(account);
            next.handle = Some(handle.clone());
            next.balance = None;
            next.set_status(CONNECTED_MESSAGE);
            effects.push(Effect::RefreshBalance(handle));
        }

        Msg::ConnectFailed(error) => {
            if error.is_user_rejection() {
                log::info!("Account request declined: {}", error);
            } else {
                log::warn!("Account request failed: {}", error);
            }
            next.connecting = false;
            if state.account.is_none() {
                next.set_status(CONNECT_FAILED_MESSAGE);
            }
        }

        Msg::AmountEdited(kind, text) => {
            if !state.processing {
                *next.inputs.slot(kind) = text;
            }
        }

        Msg::SubmitRequested(kind) => {
            let Some(handle) = &state.handle else {
                return (next, effects);
            };
            if state.processing {
                log::debug!("{} ignored, a submission is in flight", kind);
                return (next, effects);
            }
            next.processing = true;
            next.set_status(executor::processing_message(kind));
            effects.push(Effect::Submit {
                handle: handle.clone(),
                kind,
                raw_amount: state.inputs.get(kind).to_string(),
            });
        }

        Msg::TxConfirmed(kind, receipt) => {
            log::debug!("{} receipt {}", kind, receipt.transaction_hash);
            next.processing = false;
            next.inputs.slot(kind).clear();
            next.set_status(executor::success_message(kind));
            if let Some(handle) = &state.handle {
                effects.push(Effect::RefreshBalance(handle.clone()));
            }
        }

        Msg::TxFailed(kind, error) => {
            if error.is_input_error() || error.is_user_rejection() {
                log::info!("{} not submitted: {}", kind, error);
            } else {
                log::error!("{} failed: {}", kind, error);
            }
            next.processing = false;
            next.set_status(executor::failure_message(kind, &error));
        }

        Msg::SubmissionAbandoned(kind) => {
            if state.processing {
                next.processing = false;
                let error = AtmError::ProviderError("submission abandoned".to_string());
                next.set_status(executor::failure_message(kind, &error));
            }
        }

        Msg::BalanceLoaded(snapshot) => {
            if state.account == Some(snapshot.account) {
                next.balance = Some(snapshot);
            } else {
                log::debug!("Discarding balance read for {}", snapshot.account);
            }
        }

        Msg::BalanceFailed(error) => {
            log::warn!("Balance read failed: {}", error);
            next.set_status(BALANCE_FAILED_MESSAGE);
        }
    }

    (next, effects)
}

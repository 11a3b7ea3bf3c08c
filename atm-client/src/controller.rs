//! Runs the reducer and its effects.
//!
//! The state lives behind a `parking_lot::Mutex` that is only held while
//! [`update`] runs; effects execute with the lock released and report back
//! through further messages.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::app_state::{update, AppState, ContractTarget, Effect, Msg};
use crate::balance;
use crate::contract::TxKind;
use crate::errors::AtmResult;
use crate::executor;
use crate::provider::{self, HostEnvironment};
use crate::session;
use crate::validation::InputValidator;
use crate::view::{self, UserEvent, View};

const STATUS_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug)]
pub struct Controller {
    state: Mutex<AppState>,
    validator: InputValidator,
    status_tx: broadcast::Sender<String>,
}

impl Controller {
    pub fn new(target: ContractTarget) -> AtmResult<Self> {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Ok(Self {
            state: Mutex::new(AppState::new(target)),
            validator: InputValidator::new()?,
            status_tx,
        })
    }

    /// Detect the wallet and, if present, silently restore an authorized
    /// account. Call once at startup.
    pub async fn start(&self, host: &dyn HostEnvironment) {
        let detected = provider::detect(host);
        self.dispatch(Msg::WalletDetected(detected)).await;
    }

    /// Route a user event into the reducer. Events for controls the current
    /// view does not show are dropped.
    pub async fn handle(&self, event: UserEvent) {
        if !self.view().accepts(&event) {
            log::debug!("Ignoring {:?} in the current view", event);
            return;
        }
        self.dispatch(view::route(event)).await;
    }

    pub fn view(&self) -> View {
        self.read(view::render)
    }

    pub fn snapshot(&self) -> AppState {
        self.read(AppState::clone)
    }

    pub fn read<F, T>(&self, op: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        let guard = self.state.lock();
        op(&guard)
    }

    /// Every status message, in the order it was set.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.status_tx.subscribe()
    }

    async fn dispatch(&self, msg: Msg) {
        let mut pending: VecDeque<Effect> = self.apply(msg).into();
        while let Some(effect) = pending.pop_front() {
            let outcome = self.run(effect).await;
            pending.extend(self.apply(outcome));
        }
    }

    fn apply(&self, msg: Msg) -> Vec<Effect> {
        let mut state = self.state.lock();
        let (next, effects) = update(&state, msg);
        let status_changed = next.status_revision != state.status_revision;
        *state = next;

        if status_changed {
            if let Some(status) = &state.status {
                // No receivers is fine; the status is still in the state.
                let _ = self.status_tx.send(status.clone());
            }
        }
        effects
    }

    async fn run(&self, effect: Effect) -> Msg {
        match effect {
            Effect::ReadAuthorizedAccounts(provider) => {
                Msg::AccountsResolved(session::read_authorized_accounts(provider.as_ref()).await)
            }
            Effect::RequestAccounts(provider) => {
                match session::request_accounts(provider.as_ref()).await {
                    Ok(account) => Msg::AccountsResolved(account),
                    Err(e) => Msg::ConnectFailed(e),
                }
            }
            Effect::RefreshBalance(handle) => match balance::refresh(&handle).await {
                Ok(snapshot) => Msg::BalanceLoaded(snapshot),
                Err(e) => Msg::BalanceFailed(e),
            },
            Effect::Submit {
                handle,
                kind,
                raw_amount,
            } => {
                let guard = ProcessingGuard::arm(self, kind);
                let outcome = executor::execute(&handle, kind, &raw_amount, &self.validator).await;
                guard.disarm();
                match outcome {
                    Ok(receipt) => Msg::TxConfirmed(kind, receipt),
                    Err(e) => Msg::TxFailed(kind, e),
                }
            }
        }
    }
}

/// Clears the processing flag if a submission future is dropped before it
/// produces an outcome.
struct ProcessingGuard<'a> {
    controller: &'a Controller,
    kind: TxKind,
    armed: bool,
}

impl<'a> ProcessingGuard<'a> {
    fn arm(controller: &'a Controller, kind: TxKind) -> Self {
        Self {
            controller,
            kind,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("{} submission dropped before completing", self.kind);
            self.controller.apply(Msg::SubmissionAbandoned(self.kind));
        }
    }
}

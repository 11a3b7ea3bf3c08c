//! What the user sees, derived from [`AppState`].

use std::fmt;

use crate::app_state::{AppState, Msg, Phase};
use crate::blockchain::Address;
use crate::contract::TxKind;

pub const TITLE: &str = "Ethereum ATM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Detecting,
    NoWallet { message: String },
    Connect { status: Option<String> },
    Binding { account: Address },
    Dashboard(Dashboard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub account: Address,
    /// Formatted ether balance; `None` until the first read lands.
    pub balance: Option<String>,
    pub deposit_input: String,
    pub withdraw_input: String,
    pub controls_enabled: bool,
    pub status: Option<String>,
}

/// Input the user can produce from the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    Connect,
    EditAmount(TxKind, String),
    Submit(TxKind),
}

pub fn render(state: &AppState) -> View {
    let account = match (state.phase(), state.account) {
        (Phase::Detecting, _) => return View::Detecting,
        (Phase::NoWallet, _) => {
            return View::NoWallet {
                message: state.status.clone().unwrap_or_default(),
            }
        }
        (Phase::Binding, Some(account)) => return View::Binding { account },
        (Phase::Ready, Some(account)) => account,
        _ => {
            return View::Connect {
                status: state.status.clone(),
            }
        }
    };

    View::Dashboard(Dashboard {
        account,
        balance: state.balance.as_ref().map(|b| b.formatted()),
        deposit_input: state.inputs.get(TxKind::Deposit).to_string(),
        withdraw_input: state.inputs.get(TxKind::Withdraw).to_string(),
        controls_enabled: !state.processing,
        status: state.status.clone(),
    })
}

impl View {
    /// Whether `event` targets a control present in this view.
    pub fn accepts(&self, event: &UserEvent) -> bool {
        match (self, event) {
            (View::Connect { .. }, UserEvent::Connect) => true,
            (View::Dashboard(_), UserEvent::EditAmount(..) | UserEvent::Submit(_)) => true,
            _ => false,
        }
    }
}

pub fn route(event: UserEvent) -> Msg {
    match event {
        UserEvent::Connect => Msg::ConnectRequested,
        UserEvent::EditAmount(kind, text) => Msg::AmountEdited(kind, text),
        UserEvent::Submit(kind) => Msg::SubmitRequested(kind),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "== {} ==", TITLE)?;
        match self {
            View::Detecting => writeln!(f, "Detecting wallet..."),
            View::NoWallet { message } => writeln!(f, "{}", message),
            View::Connect { status } => {
                writeln!(f, "[ Connect Wallet ]  (type `connect`)")?;
                if let Some(status) = status {
                    writeln!(f, "{}", status)?;
                }
                Ok(())
            }
            View::Binding { account } => writeln!(f, "Preparing contract for {}...", account),
            View::Dashboard(dashboard) => fmt::Display::fmt(dashboard, f),
        }
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Connected Account: {}", self.account)?;
        match &self.balance {
            Some(balance) => writeln!(f, "Balance: {} ETH", balance)?,
            None => writeln!(f, "Balance: loading...")?,
        }
        let marker = if self.controls_enabled { "" } else { " (busy)" };
        writeln!(
            f,
            "Deposit:  [{:<12}] deposit <amount>{}",
            self.deposit_input, marker
        )?;
        writeln!(
            f,
            "Withdraw: [{:<12}] withdraw <amount>{}",
            self.withdraw_input, marker
        )?;
        if let Some(status) = &self.status {
            writeln!(f, "{}", status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::{update, ContractTarget};
    use crate::balance::BalanceSnapshot;
    use crate::blockchain::Amount;
    use crate::contract::InterfaceDescriptor;
    use crate::provider::NO_WALLET_MESSAGE;
    use crate::testing::{MockProvider, ACCOUNT_A, CONTRACT};

    fn fresh() -> AppState {
        AppState::new(ContractTarget::new(CONTRACT, InterfaceDescriptor::default()))
    }

    #[test]
    fn views_follow_the_session_phase() {
        let state = fresh();
        assert_eq!(render(&state), View::Detecting);

        let (absent, _) = update(&state, Msg::WalletDetected(None));
        assert_eq!(
            render(&absent),
            View::NoWallet {
                message: NO_WALLET_MESSAGE.to_string()
            }
        );

        let provider = MockProvider::default();
        let (present, _) = update(&state, Msg::WalletDetected(Some(provider.shared())));
        assert_eq!(render(&present), View::Connect { status: None });

        let (ready, _) = update(&present, Msg::AccountsResolved(Some(ACCOUNT_A)));
        match render(&ready) {
            View::Dashboard(dashboard) => {
                assert_eq!(dashboard.account, ACCOUNT_A);
                assert_eq!(dashboard.balance, None);
                assert!(dashboard.controls_enabled);
            }
            other => panic!("expected dashboard, got {:?}", other),
        }
    }

    #[test]
    fn dashboard_shows_balance_and_busy_controls() {
        let provider = MockProvider::default();
        let (state, _) = update(&fresh(), Msg::WalletDetected(Some(provider.shared())));
        let (state, _) = update(&state, Msg::AccountsResolved(Some(ACCOUNT_A)));
        let snapshot = BalanceSnapshot::new(Amount::from_string("2.5").unwrap(), ACCOUNT_A);
        let (state, _) = update(&state, Msg::BalanceLoaded(snapshot));
        let (state, _) = update(&state, Msg::SubmitRequested(TxKind::Deposit));

        let view = render(&state);
        let View::Dashboard(dashboard) = &view else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.balance.as_deref(), Some("2.5"));
        assert!(!dashboard.controls_enabled);

        let text = view.to_string();
        assert!(text.contains("Balance: 2.5 ETH"));
        assert!(text.contains("(busy)"));
        assert!(text.contains("Processing deposit..."));
    }

    #[test]
    fn events_outside_their_view_are_not_accepted() {
        let connect = View::Connect { status: None };
        assert!(connect.accepts(&UserEvent::Connect));
        assert!(!connect.accepts(&UserEvent::Submit(TxKind::Deposit)));
        assert!(!View::Detecting.accepts(&UserEvent::Connect));
        assert!(matches!(
            route(UserEvent::EditAmount(TxKind::Withdraw, "1".into())),
            Msg::AmountEdited(TxKind::Withdraw, _)
        ));
    }
}

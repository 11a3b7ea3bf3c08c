use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use eth_atm_lib::config_store::KEY_ENVIRONMENT;
use eth_atm_lib::{
    ConfigStore, ContractTarget, Controller, InterfaceDescriptor, Phase, RpcHost, TxKind,
    UserEvent,
};

#[derive(Debug, Parser)]
#[command(name = "eth-atm", version, about = "Deposit and withdraw ether through an ATM contract")]
struct Args {
    /// Path of the checksummed configuration file; created on first run.
    #[arg(long, default_value = "atm.config")]
    config: PathBuf,

    /// Wallet JSON-RPC endpoint. Takes precedence over the config file and
    /// `ATM_RPC_URL`; an empty value runs without a wallet.
    #[arg(long)]
    rpc_url: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Events(Vec<UserEvent>),
    Show,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Command::Show;
    };
    let amount = words.next().unwrap_or_default().to_string();

    match verb.to_ascii_lowercase().as_str() {
        "connect" => Command::Events(vec![UserEvent::Connect]),
        "deposit" => submit(TxKind::Deposit, amount),
        "withdraw" => submit(TxKind::Withdraw, amount),
        "show" => Command::Show,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

fn submit(kind: TxKind, amount: String) -> Command {
    Command::Events(vec![
        UserEvent::EditAmount(kind, amount),
        UserEvent::Submit(kind),
    ])
}

const HELP: &str = "Commands: connect | deposit <amount> | withdraw <amount> | show | quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let environment =
        std::env::var(KEY_ENVIRONMENT).unwrap_or_else(|_| "development".to_string());

    let store = ConfigStore::new(&args.config);
    let mut config = store
        .load_or_default(environment)
        .with_context(|| format!("loading {}", store.path().display()))?;
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;
    if let Some(url) = args.rpc_url {
        let url = url.trim().to_string();
        config.network.endpoint = if url.is_empty() { None } else { Some(url) };
    }
    tracing::info!(
        environment = %config.environment,
        contract = %config.contract.address,
        "Configuration loaded"
    );

    let descriptor = InterfaceDescriptor::from_config(&config.contract)
        .context("resolving contract interface")?;
    let target = ContractTarget::new(config.contract.address, descriptor);
    let controller = Arc::new(Controller::new(target)?);

    let mut statuses = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match statuses.recv().await {
                Ok(status) => println!(">> {}", status),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Status printer fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    controller.start(&RpcHost::new(config.network.clone())).await;
    print!("{}", controller.view());
    if controller.read(|state| state.phase()) == Phase::NoWallet {
        return Ok(());
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Events(events) => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    for event in events {
                        controller.handle(event).await;
                    }
                    print!("{}", controller.view());
                });
            }
            Command::Show => print!("{}", controller.view()),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Unknown(verb) => println!("Unknown command `{}`. {}", verb, HELP),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terminal_commands() {
        assert_eq!(
            parse_command("connect"),
            Command::Events(vec![UserEvent::Connect])
        );
        assert_eq!(
            parse_command("  deposit 1.5 "),
            Command::Events(vec![
                UserEvent::EditAmount(TxKind::Deposit, "1.5".to_string()),
                UserEvent::Submit(TxKind::Deposit),
            ])
        );
        assert_eq!(
            parse_command("withdraw"),
            Command::Events(vec![
                UserEvent::EditAmount(TxKind::Withdraw, String::new()),
                UserEvent::Submit(TxKind::Withdraw),
            ])
        );
        assert_eq!(parse_command(""), Command::Show);
        assert_eq!(parse_command("QUIT"), Command::Quit);
        assert_eq!(parse_command("fly"), Command::Unknown("fly".to_string()));
    }
}

// lib.rs - Core library structure for the ATM client

pub mod app_state;
pub mod balance;
pub mod blockchain;
pub mod blockchain_client;
pub mod config_store;
pub mod contract;
pub mod controller;
pub mod errors;
pub mod executor;
pub mod provider;
pub mod session;
pub mod validation;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types
pub use app_state::{AppState, ContractTarget, Phase};
pub use blockchain::{Address, Amount, Receipt, TxHash};
pub use config_store::{AtmConfig, ConfigStore};
pub use contract::{InterfaceDescriptor, TxKind};
pub use controller::Controller;
pub use errors::{AtmError, AtmResult};
pub use provider::{HostEnvironment, RpcHost, WalletProvider};
pub use view::{UserEvent, View};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use alloy_primitives::address;
use blake3::Hasher as Blake3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::Address;
use crate::errors::{AtmError, AtmResult};
use crate::validation::InputValidator;

const CONFIG_VERSION: u16 = 1;

const KEY_RPC_URL: &str = "ATM_RPC_URL";
const KEY_CONTRACT_ADDRESS: &str = "ATM_CONTRACT_ADDRESS";
const KEY_ARTIFACT_PATH: &str = "ATM_ARTIFACT_PATH";
const KEY_POLL_INTERVAL_MS: &str = "ATM_POLL_INTERVAL_MS";

/// Environment variable naming the active configuration environment.
pub const KEY_ENVIRONMENT: &str = "ATM_ENV";

/// Address of the first contract deployed on a fresh Hardhat node.
pub const DEFAULT_CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Wallet JSON-RPC endpoint; `None` means no wallet is injected.
    pub endpoint: Option<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: Some("http://127.0.0.1:8545".to_string()),
            poll_interval_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractConfig {
    pub address: Address,
    /// Hardhat artifact holding the contract ABI.
    pub artifact_path: Option<PathBuf>,
    pub balance_function: String,
    pub deposit_function: String,
    pub withdraw_function: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT,
            artifact_path: None,
            balance_function: "getBalance".to_string(),
            deposit_function: "deposit".to_string(),
            withdraw_function: "withdraw".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtmConfig {
    pub network: NetworkConfig,
    pub contract: ContractConfig,
    pub environment: String,
    pub last_updated: DateTime<Utc>,
    pub version: u16,
}

impl AtmConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            network: NetworkConfig::default(),
            contract: ContractConfig::default(),
            environment: environment.into(),
            last_updated: Utc::now(),
            version: CONFIG_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Apply `ATM_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> AtmResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. An empty `ATM_RPC_URL` disables
    /// the wallet endpoint.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AtmResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(KEY_RPC_URL) {
            let url = url.trim().to_string();
            log::debug!("Overriding wallet endpoint from {}", KEY_RPC_URL);
            self.network.endpoint = if url.is_empty() { None } else { Some(url) };
        }

        if let Some(address) = lookup(KEY_CONTRACT_ADDRESS) {
            self.contract.address = InputValidator::new()?
                .parse_address(&address)
                .map_err(|e| {
                    AtmError::ConfigError(format!("{} is invalid: {}", KEY_CONTRACT_ADDRESS, e))
                })?;
        }

        if let Some(path) = lookup(KEY_ARTIFACT_PATH) {
            if !path.trim().is_empty() {
                self.contract.artifact_path = Some(PathBuf::from(path.trim()));
            }
        }

        if let Some(interval) = lookup(KEY_POLL_INTERVAL_MS) {
            self.network.poll_interval_ms = interval.trim().parse().map_err(|_| {
                AtmError::ConfigError(format!(
                    "{} must be a whole number of milliseconds",
                    KEY_POLL_INTERVAL_MS
                ))
            })?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u16,
    checksum: [u8; 32],
    payload: AtmConfig,
    modified_at_unix: i64,
}

/// Handles persistence of ATM configuration with integrity checks.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load_or_default(&self, environment: impl Into<String>) -> AtmResult<AtmConfig> {
        if !self.path.exists() {
            let config = AtmConfig::new(environment);
            self.save(&config)?;
            log::info!("Wrote default configuration to {}", self.path.display());
            return Ok(config);
        }

        let bytes = fs::read(&self.path)?;
        let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != CONFIG_VERSION {
            return Err(AtmError::ValidationError(format!(
                "Unsupported config version {}",
                envelope.version
            )));
        }

        let checksum = checksum(&envelope.payload)?;
        if checksum != envelope.checksum {
            return Err(AtmError::ValidationError(
                "Config integrity verification failed".to_string(),
            ));
        }

        Ok(envelope.payload)
    }

    pub fn save(&self, config: &AtmConfig) -> AtmResult<()> {
        let mut payload = config.clone();
        payload.touch();

        let envelope = ConfigEnvelope {
            version: CONFIG_VERSION,
            checksum: checksum(&payload)?,
            modified_at_unix: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_err(|e| AtmError::StorageError(e.to_string()))?
                .as_secs() as i64,
            payload,
        };

        let serialized = serde_json::to_vec_pretty(&envelope)?;
        let tmp_path = self.path.with_extension("new");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn checksum(config: &AtmConfig) -> AtmResult<[u8; 32]> {
    let mut hasher = Blake3::new();
    let encoded = serde_json::to_vec(config)?;
    hasher.update(&encoded);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    Ok(output)
}

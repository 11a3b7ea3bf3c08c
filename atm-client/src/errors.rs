use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtmError {
    // Provider errors
    UserRejected(String),
    ProviderError(String),

    // Network errors
    NetworkError(String),
    InvalidResponse(String),

    // Contract errors
    Reverted(String),

    // Validation errors
    ValidationError(String),
    InvalidAddress(String),
    InvalidAmount(String),

    // Configuration and storage errors
    ConfigError(String),
    StorageError(String),
    FileNotFound(String),
}

impl AtmError {
    /// True for failures the user caused by declining a wallet prompt.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, AtmError::UserRejected(_))
    }

    /// True for failures raised before anything was sent to the provider.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AtmError::InvalidAmount(_) | AtmError::ValidationError(_)
        )
    }
}

impl fmt::Display for AtmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AtmError::UserRejected(msg) => write!(f, "Request rejected by user: {}", msg),
            AtmError::ProviderError(msg) => write!(f, "Provider error: {}", msg),

            AtmError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AtmError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            AtmError::Reverted(msg) => write!(f, "Transaction reverted: {}", msg),

            AtmError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AtmError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            AtmError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),

            AtmError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AtmError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AtmError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
        }
    }
}

impl std::error::Error for AtmError {}

pub type AtmResult<T> = Result<T, AtmError>;

impl From<std::io::Error> for AtmError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => AtmError::FileNotFound(error.to_string()),
            _ => AtmError::StorageError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AtmError {
    fn from(error: serde_json::Error) -> Self {
        AtmError::ValidationError(format!("JSON error: {}", error))
    }
}

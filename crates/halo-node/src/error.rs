//! Node error types

use halo_core::LedgerError;
use halo_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Configuration encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
}

impl NodeError {
    /// Ledger error code, or 5000 for infrastructure failures
    pub fn code(&self) -> u32 {
        match self {
            Self::Ledger(e) => e.code(),
            Self::Storage(_) => 5001,
            Self::Config(_) | Self::ConfigSource(_) | Self::ConfigEncode(_) => 5002,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_recoverable(),
            Self::Storage(_) => true,
            _ => false,
        }
    }
}

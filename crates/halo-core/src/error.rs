//! Error types for Halo ledger operations

use crate::types::{Address, PoolClass};
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations
///
/// Every mutating operation either applies completely or returns one of these
/// with prior state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Configuration ===
    /// `configure` called on an already configured engine
    #[error("Reward engine already configured")]
    AlreadyConfigured,

    /// Operation attempted before `configure`
    #[error("Reward engine not configured")]
    NotConfigured,

    /// Rejected configuration parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Pools and positions ===
    /// Pool is not whitelisted in the given class
    #[error("Unknown {class} pool: {pool}")]
    UnknownPool { class: PoolClass, pool: Address },

    /// Withdrawal or redemption larger than the recorded balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    /// Amount too small to mint a single chest share
    #[error("Amount {amount} below minimum {minimum}")]
    BelowMinimum { amount: u128, minimum: u128 },

    // === Minter ===
    /// Mint amount not covered by collateral at the configured ratio
    #[error("Insufficient collateral: {required} required, {provided} provided")]
    InsufficientCollateral { required: u128, provided: u128 },

    /// One-time wiring call repeated
    #[error("{0} contract already wired")]
    AlreadyWired(&'static str),

    /// Minter used before its collaborators were wired
    #[error("{0} contract not wired")]
    NotWired(&'static str),

    /// Rewards engine passed to the minter is not the wired one
    #[error("Rewards contract mismatch: wired {wired}, got {actual}")]
    RewardsContractMismatch { wired: Address, actual: Address },

    /// Chest passed to a vesting release is not the wired one
    #[error("HALO chest mismatch: wired {wired}, got {actual}")]
    HaloChestMismatch { wired: Address, actual: Address },

    // === Math ===
    /// Fixed-point intermediate exceeded u128
    #[error("Arithmetic overflow in {0}")]
    MathOverflow(&'static str),
}

/// Error codes for API responses
impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::AlreadyConfigured => 2001,
            Self::NotConfigured => 2002,
            Self::InvalidConfig(_) => 2003,
            Self::UnknownPool { .. } => 2004,
            Self::InsufficientBalance { .. } => 2005,
            Self::InsufficientCollateral { .. } => 2006,
            Self::AlreadyWired(_) => 2007,
            Self::NotWired(_)
            | Self::RewardsContractMismatch { .. }
            | Self::HaloChestMismatch { .. } => 2008,
            Self::BelowMinimum { .. } => 2009,
            Self::MathOverflow(_) => 9001,
        }
    }

    /// Check if the caller may retry the same call later with success
    ///
    /// Balance and collateral failures depend on ledger state that other
    /// calls can change; the rest are permanent for the given inputs.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InsufficientCollateral { .. }
                | Self::NotConfigured
                | Self::NotWired(_)
        )
    }
}

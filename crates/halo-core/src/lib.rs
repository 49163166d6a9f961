//! # Halo Core
//!
//! Shared building blocks for the Halo reward ledger:
//! - `Address` - 20-byte identifiers for users, tokens and pools
//! - `LedgerError` - every failure the ledgers report
//! - `TimeSource` - wall-clock abstraction used for epoch computation
//! - `fixed` - 18-decimal fixed-point helpers

pub mod clock;
pub mod error;
pub mod fixed;
pub mod types;

pub use clock::*;
pub use error::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{ManualClock, SystemClock, TimeSource};
    pub use crate::error::{LedgerError, Result};
    pub use crate::fixed::{ACC_PRECISION, BPS_DENOMINATOR, WAD};
    pub use crate::types::*;
}

//! # Halo Node
//!
//! Configuration loading and the serialized ledger service that the `halo`
//! binary drives.

pub mod config;
pub mod error;
pub mod service;

pub use config::LedgerConfig;
pub use error::{NodeError, Result};
pub use service::{LedgerService, LedgerState, SNAPSHOT_KEY};

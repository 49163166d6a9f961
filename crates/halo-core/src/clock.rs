//! Wall-clock time sources
//!
//! Epoch indices are a pure function of a Unix timestamp, so the ledger never
//! reads the clock itself. Callers pass `now` explicitly; services obtain it
//! from a [`TimeSource`].

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current Unix timestamp in seconds
pub trait TimeSource: Send + Sync {
    fn now(&self) -> i64;
}

/// System wall clock (UTC)
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually advanced clock for simulations and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Move the clock forward by `secs` and return the new time
    pub fn advance(&self, secs: i64) -> i64 {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }

    pub fn set(&self, timestamp: i64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

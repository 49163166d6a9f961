//! # Decay Schedule
//!
//! Geometric epoch-over-epoch decay of the HALO reward budget.
//!
//! ```text
//! Epoch 0: 7,500,000 HALO
//! Epoch 1: 6,097,500 HALO   (x 0.813)
//! Epoch 2: 4,957,267 HALO   (x 0.813)
//! Epoch 3: 4,030,258 HALO   (x 0.813)
//! ...
//! ```
//!
//! Decay is applied one epoch at a time in 18-decimal fixed point, never as a
//! single `decay^k` exponent, so every epoch rounds exactly as a per-epoch
//! settlement would.
//!
//! Each epoch budget is split three ways in basis points: AMM-LP pools,
//! Minter-LP pools and the vesting bucket.

use halo_core::fixed::{bps_of, wad_mul, BPS_DENOMINATOR, WAD};
use halo_core::{Amount, EpochIndex, LedgerError, PoolClass, Result};
use serde::{Deserialize, Serialize};

/// Basis-point split of an epoch budget between reward destinations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRatios {
    /// Share for AMM-LP pools
    pub amm_lp_bps: u32,
    /// Share for Minter-LP pools
    pub minter_lp_bps: u32,
    /// Share retained for vesting
    pub vesting_bps: u32,
}

impl Default for ClassRatios {
    fn default() -> Self {
        Self {
            amm_lp_bps: 5_000,
            minter_lp_bps: 5_000,
            vesting_bps: 0,
        }
    }
}

impl ClassRatios {
    /// Ratios must cover the whole budget
    pub fn validate(&self) -> Result<()> {
        let sum = self.amm_lp_bps as u128 + self.minter_lp_bps as u128 + self.vesting_bps as u128;
        if sum != BPS_DENOMINATOR {
            return Err(LedgerError::InvalidConfig(format!(
                "class ratios sum to {sum} bps, expected {BPS_DENOMINATOR}"
            )));
        }
        Ok(())
    }

    pub fn for_class(&self, class: PoolClass) -> u32 {
        match class {
            PoolClass::Amm => self.amm_lp_bps,
            PoolClass::Minter => self.minter_lp_bps,
        }
    }

    /// Split an epoch budget
    pub fn split(&self, budget: Amount) -> Result<BudgetSplit> {
        Ok(BudgetSplit {
            total: budget,
            amm_lp: bps_of(budget, self.amm_lp_bps, "amm split")?,
            minter_lp: bps_of(budget, self.minter_lp_bps, "minter split")?,
            vesting: bps_of(budget, self.vesting_bps, "vesting split")?,
        })
    }
}

/// One epoch budget broken down by destination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSplit {
    pub total: Amount,
    pub amm_lp: Amount,
    pub minter_lp: Amount,
    pub vesting: Amount,
}

impl BudgetSplit {
    /// Parts never exceed the total; rounding dust stays below 3 units
    pub fn verify(&self) -> bool {
        let sum = self.amm_lp + self.minter_lp + self.vesting;
        sum <= self.total && self.total - sum < 3
    }
}

/// Decaying budget schedule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecaySchedule {
    /// Budget of epoch 0
    pub initial_budget: Amount,
    /// Per-epoch multiplier in WAD (0.813 = 813e15)
    pub decay_factor: u128,
    /// Epoch length in seconds
    pub epoch_length_secs: u64,
    /// Unix timestamp of epoch 0
    pub start_timestamp: i64,
}

impl DecaySchedule {
    pub fn new(
        initial_budget: Amount,
        decay_factor: u128,
        epoch_length_secs: u64,
        start_timestamp: i64,
    ) -> Result<Self> {
        if epoch_length_secs == 0 {
            return Err(LedgerError::InvalidConfig(
                "epoch length must be positive".to_string(),
            ));
        }
        if decay_factor > WAD {
            return Err(LedgerError::InvalidConfig(format!(
                "decay factor {decay_factor} exceeds 1.0"
            )));
        }
        Ok(Self {
            initial_budget,
            decay_factor,
            epoch_length_secs,
            start_timestamp,
        })
    }

    /// Epoch containing `timestamp`; timestamps before the start map to 0
    pub fn epoch_at(&self, timestamp: i64) -> EpochIndex {
        if timestamp <= self.start_timestamp {
            return 0;
        }
        timestamp.abs_diff(self.start_timestamp) / self.epoch_length_secs
    }

    /// Unix timestamp at which `epoch` begins
    pub fn epoch_start(&self, epoch: EpochIndex) -> i64 {
        let offset = epoch.saturating_mul(self.epoch_length_secs);
        self.start_timestamp
            .saturating_add(i64::try_from(offset).unwrap_or(i64::MAX))
    }

    /// Apply one epoch of decay
    pub fn decay_once(&self, budget: Amount) -> Result<Amount> {
        wad_mul(budget, self.decay_factor, "budget decay")
    }

    /// Budget after decaying `from` budget across `epochs` boundaries
    pub fn decay_from(&self, mut budget: Amount, epochs: u64) -> Result<Amount> {
        for _ in 0..epochs {
            if budget == 0 {
                break;
            }
            budget = self.decay_once(budget)?;
        }
        Ok(budget)
    }

    /// Budget of `epoch`, computed epoch by epoch from the initial budget
    pub fn budget_at_epoch(&self, epoch: EpochIndex) -> Result<Amount> {
        self.decay_from(self.initial_budget, epoch)
    }

    /// Sum of the budgets of epochs `0..epochs`
    pub fn cumulative_budget(&self, epochs: EpochIndex) -> Result<Amount> {
        let mut total: Amount = 0;
        let mut budget = self.initial_budget;
        for _ in 0..epochs {
            if budget == 0 {
                break;
            }
            total = total
                .checked_add(budget)
                .ok_or(LedgerError::MathOverflow("cumulative budget"))?;
            budget = self.decay_once(budget)?;
        }
        Ok(total)
    }
}

/// Engine-wide budget cursor
///
/// Remembers the most recent epoch whose budget has been computed so that
/// later updates continue decaying from there instead of from epoch 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCursor {
    pub epoch: EpochIndex,
    pub budget: Amount,
}

impl BudgetCursor {
    pub fn genesis(schedule: &DecaySchedule) -> Self {
        Self {
            epoch: 0,
            budget: schedule.initial_budget,
        }
    }

    /// Cursor moved forward to `epoch`; never moves backwards
    pub fn advanced_to(&self, schedule: &DecaySchedule, epoch: EpochIndex) -> Result<Self> {
        if epoch <= self.epoch {
            return Ok(self.clone());
        }
        Ok(Self {
            epoch,
            budget: schedule.decay_from(self.budget, epoch - self.epoch)?,
        })
    }
}

//! # Halo Economics - Decaying Epoch Rewards & Collateral Minter
//!
//! Reward accounting for the HALO liquidity programme.
//!
//! ## Key Features
//!
//! - **Geometric decay**: each epoch budget is the previous one times 0.813
//! - **Weighted pools**: AMM-LP and Minter-LP classes with fixed allocation points
//! - **Reward accumulators**: per-share accounting with reward debt
//! - **Collateral minter**: over-collateralized minting that feeds Minter-LP pools
//! - **HALO chest**: HALOHALO share ledger that vested rewards flow into
//!
//! ## Budget Schedule
//!
//! | Epoch | Budget | Each class (50/50) |
//! |-------|--------|--------------------|
//! | 0 | 7,500,000 HALO | 3,750,000 HALO |
//! | 1 | 6,097,500 HALO | 3,048,750 HALO |
//! | 2 | 4,957,267.5 HALO | 2,478,633.75 HALO |
//! | ... | (x 0.813 per epoch) | ... |

pub mod chest;
pub mod decay;
pub mod minter;
pub mod pool;
pub mod position;
pub mod rewards;

// Re-exports
pub use chest::HaloChest;
pub use decay::{BudgetCursor, BudgetSplit, ClassRatios, DecaySchedule};
pub use minter::{CollateralAccount, CollateralTotals, MinterLedger};
pub use pool::{Pool, PoolInfo, PoolSet, PoolWeight};
pub use position::UserPosition;
pub use rewards::{MinterRewards, RewardEngineConfig, RewardEpochEngine};

/// HALO token constants
pub mod constants {
    use halo_core::fixed::WAD;

    /// Token symbol
    pub const SYMBOL: &str = "HALO";

    /// One HALO in smallest unit
    pub const ONE_HALO: u128 = WAD;

    /// Budget of epoch 0: 7.5 million HALO
    pub const DEFAULT_INITIAL_BUDGET: u128 = 7_500_000 * ONE_HALO;

    /// Per-epoch decay multiplier
    pub const DEFAULT_DECAY_FACTOR: &str = "0.813";

    /// Epoch length in seconds
    pub const DEFAULT_EPOCH_LENGTH_SECS: u64 = 30;

    /// AMM-LP share of each epoch budget
    pub const DEFAULT_AMM_LP_BPS: u32 = 5_000;

    /// Minter-LP share of each epoch budget
    pub const DEFAULT_MINTER_LP_BPS: u32 = 5_000;

    /// Collateral per minted PHM (1.0)
    pub const DEFAULT_COLLATERALIZATION_RATIO: &str = "1";
}

pub use constants::*;

#[cfg(test)]
mod tests {
    use super::*;
    use halo_core::fixed::{parse_wad, BPS_DENOMINATOR};

    #[test]
    fn test_initial_budget() {
        assert_eq!(DEFAULT_INITIAL_BUDGET, 7_500_000 * ONE_HALO);
    }

    #[test]
    fn test_default_constants_parse() {
        assert_eq!(parse_wad(DEFAULT_DECAY_FACTOR).unwrap(), 813 * ONE_HALO / 1_000);
        assert_eq!(parse_wad(DEFAULT_COLLATERALIZATION_RATIO).unwrap(), ONE_HALO);
        assert_eq!(
            (DEFAULT_AMM_LP_BPS + DEFAULT_MINTER_LP_BPS) as u128,
            BPS_DENOMINATOR
        );
    }
}

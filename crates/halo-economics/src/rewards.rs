//! # Reward Epoch Engine
//!
//! Distributes the decaying epoch budget into per-pool accumulators.
//!
//! ## Flow
//!
//! 1. `configure` fixes the decay schedule, class ratios and weight tables
//! 2. users `deposit` / `withdraw` LP tokens (AMM class) while the minter
//!    ledger feeds collateral into the Minter class through [`MinterRewards`]
//! 3. once an epoch boundary has passed, `update_*_reward_pool` credits the
//!    pool's weighted share of the decayed budget to its accumulator
//! 4. users read `pending_*` and `claim_*`
//! 5. the vesting share accrues in a bucket that `release_vested_rewards`
//!    moves into the wired [`HaloChest`]
//!
//! Reads never update pools: callers run the update first for a fresh figure.

use crate::chest::HaloChest;
use crate::decay::{BudgetCursor, ClassRatios, DecaySchedule};
use crate::pool::{Pool, PoolInfo, PoolSet, PoolWeight};
use crate::position::UserPosition;
use halo_core::fixed::{bps_of, mul_div, ACC_PRECISION};
use halo_core::{Address, Amount, EpochIndex, LedgerError, PoolClass, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Parameters accepted by [`RewardEpochEngine::configure`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEngineConfig {
    /// Budget of epoch 0 in smallest units
    pub initial_budget: Amount,
    /// Per-epoch decay multiplier in WAD
    pub decay_factor: u128,
    pub epoch_length_secs: u64,
    pub start_timestamp: i64,
    pub ratios: ClassRatios,
    pub amm_pools: Vec<PoolWeight>,
    pub minter_pools: Vec<PoolWeight>,
}

/// Collateral hook the minter ledger calls into
///
/// Deposits and redemptions of collateral change the Minter-class pool balance
/// that per-share accumulation divides by.
pub trait MinterRewards {
    /// Identity the minter was wired to
    fn rewards_address(&self) -> Address;

    fn deposit_minter(&mut self, collateral: Address, amount: Amount, user: Address) -> Result<()>;

    fn withdraw_minter(&mut self, collateral: Address, amount: Amount, user: Address)
        -> Result<()>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EngineState {
    schedule: DecaySchedule,
    ratios: ClassRatios,
    cursor: BudgetCursor,
    amm: PoolSet,
    minter: PoolSet,
    unclaimed_vesting: Amount,
    total_vesting_released: Amount,
    total_rewards_claimed: Amount,
}

impl EngineState {
    fn pools(&self, class: PoolClass) -> &PoolSet {
        match class {
            PoolClass::Amm => &self.amm,
            PoolClass::Minter => &self.minter,
        }
    }

    fn pools_mut(&mut self, class: PoolClass) -> &mut PoolSet {
        match class {
            PoolClass::Amm => &mut self.amm,
            PoolClass::Minter => &mut self.minter,
        }
    }
}

/// Reward epoch engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardEpochEngine {
    /// Address the minter ledger is wired to
    address: Address,
    /// Chest that receives vested rewards
    halo_chest: Option<Address>,
    state: Option<EngineState>,
}

impl RewardEpochEngine {
    /// Create an unconfigured engine identified by `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            halo_chest: None,
            state: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    /// One-time setup
    pub fn configure(&mut self, config: RewardEngineConfig) -> Result<()> {
        if self.state.is_some() {
            return Err(LedgerError::AlreadyConfigured);
        }

        let schedule = DecaySchedule::new(
            config.initial_budget,
            config.decay_factor,
            config.epoch_length_secs,
            config.start_timestamp,
        )?;
        config.ratios.validate()?;
        let amm = PoolSet::from_weights(PoolClass::Amm, &config.amm_pools)?;
        let minter = PoolSet::from_weights(PoolClass::Minter, &config.minter_pools)?;

        info!(
            initial_budget = %config.initial_budget,
            epoch_length = config.epoch_length_secs,
            start = config.start_timestamp,
            amm_pools = config.amm_pools.len(),
            minter_pools = config.minter_pools.len(),
            "Reward engine configured"
        );

        self.state = Some(EngineState {
            cursor: BudgetCursor::genesis(&schedule),
            schedule,
            ratios: config.ratios,
            amm,
            minter,
            unclaimed_vesting: 0,
            total_vesting_released: 0,
            total_rewards_claimed: 0,
        });
        Ok(())
    }

    fn state(&self) -> Result<&EngineState> {
        self.state.as_ref().ok_or(LedgerError::NotConfigured)
    }

    fn state_mut(&mut self) -> Result<&mut EngineState> {
        self.state.as_mut().ok_or(LedgerError::NotConfigured)
    }

    // === Epochs and budget ===

    /// Epoch index containing `now`
    pub fn current_epoch(&self, now: i64) -> Result<EpochIndex> {
        Ok(self.state()?.schedule.epoch_at(now))
    }

    pub fn schedule(&self) -> Result<&DecaySchedule> {
        Ok(&self.state()?.schedule)
    }

    pub fn ratios(&self) -> Result<ClassRatios> {
        Ok(self.state()?.ratios)
    }

    /// Budget of the latest epoch the engine has advanced to
    pub fn current_budget(&self) -> Result<Amount> {
        Ok(self.state()?.cursor.budget)
    }

    /// Latest epoch the engine has advanced to
    pub fn budget_epoch(&self) -> Result<EpochIndex> {
        Ok(self.state()?.cursor.epoch)
    }

    /// Budget of an arbitrary epoch, independent of engine progress
    pub fn budget_at_epoch(&self, epoch: EpochIndex) -> Result<Amount> {
        self.state()?.schedule.budget_at_epoch(epoch)
    }

    // === Pool updates ===

    pub fn update_amm_reward_pool(&mut self, pool: Address, now: i64) -> Result<PoolInfo> {
        self.update_pool(PoolClass::Amm, pool, now)
    }

    pub fn update_minter_reward_pool(&mut self, pool: Address, now: i64) -> Result<PoolInfo> {
        self.update_pool(PoolClass::Minter, pool, now)
    }

    /// Update every pool of both classes
    pub fn mass_update_pools(&mut self, now: i64) -> Result<Vec<PoolInfo>> {
        let mut infos = Vec::new();
        for class in [PoolClass::Amm, PoolClass::Minter] {
            for pool in self.state()?.pools(class).addresses() {
                infos.push(self.update_pool(class, pool, now)?);
            }
        }
        Ok(infos)
    }

    /// Credit the pool's share of the current epoch budget
    ///
    /// No-op while `now` is still in the pool's last update epoch. All values
    /// are computed before any state is written.
    pub fn update_pool(&mut self, class: PoolClass, pool: Address, now: i64) -> Result<PoolInfo> {
        let state = self.state_mut()?;
        let current = state.schedule.epoch_at(now);
        let target = state.pools(class).get(&pool)?;
        if current <= target.last_update_epoch {
            return Ok(target.info());
        }

        // Budget of `current`, advancing the engine cursor when it moves forward
        let (cursor, vesting_credit) = if current > state.cursor.epoch {
            let next = state.cursor.advanced_to(&state.schedule, current)?;
            let vesting = bps_of(next.budget, state.ratios.vesting_bps, "vesting share")?;
            (next, vesting)
        } else if current == state.cursor.epoch {
            (state.cursor.clone(), 0)
        } else {
            let past = BudgetCursor {
                epoch: current,
                budget: state.schedule.budget_at_epoch(current)?,
            };
            (past, 0)
        };

        let class_budget = bps_of(cursor.budget, state.ratios.for_class(class), "class budget")?;
        let share = state.pools(class).weighted_share(&pool, class_budget)?;
        let distributable = share
            .checked_add(target.undistributed)
            .ok_or(LedgerError::MathOverflow("undistributed carry"))?;

        let (acc, undistributed) = if target.total_deposited == 0 {
            (target.acc_reward_per_share, distributable)
        } else {
            let delta = mul_div(
                distributable,
                ACC_PRECISION,
                target.total_deposited,
                "accumulator delta",
            )?;
            let acc = target
                .acc_reward_per_share
                .checked_add(delta)
                .ok_or(LedgerError::MathOverflow("accumulator"))?;
            // Truncation dust is carried to the next update
            let paid = mul_div(
                delta,
                target.total_deposited,
                ACC_PRECISION,
                "accumulator payout",
            )?;
            (acc, distributable.saturating_sub(paid))
        };
        let unclaimed_vesting = state
            .unclaimed_vesting
            .checked_add(vesting_credit)
            .ok_or(LedgerError::MathOverflow("vesting bucket"))?;

        // Commit
        if cursor.epoch > state.cursor.epoch {
            state.cursor = cursor.clone();
            state.unclaimed_vesting = unclaimed_vesting;
        }
        let target = state.pools_mut(class).get_mut(&pool)?;
        if target.total_deposited == 0 {
            warn!(%class, %pool, carried = %undistributed, "Pool has no deposits, reward carried forward");
        }
        target.acc_reward_per_share = acc;
        target.undistributed = undistributed;
        target.last_update_epoch = current;

        debug!(
            %class,
            %pool,
            epoch = current,
            budget = %cursor.budget,
            share = %share,
            acc = %acc,
            "Pool updated"
        );
        Ok(target.info())
    }

    // === Deposits ===

    /// Deposit AMM LP tokens
    pub fn deposit(&mut self, pool: Address, amount: Amount, user: Address) -> Result<UserPosition> {
        self.deposit_to(PoolClass::Amm, pool, amount, user)
    }

    /// Withdraw AMM LP tokens
    pub fn withdraw(&mut self, pool: Address, amount: Amount, user: Address) -> Result<UserPosition> {
        self.withdraw_from(PoolClass::Amm, pool, amount, user)
    }

    /// Settle pending reward, then add `amount` to the user's position
    ///
    /// Minter-class balances only move through [`MinterRewards`].
    pub(crate) fn deposit_to(
        &mut self,
        class: PoolClass,
        pool: Address,
        amount: Amount,
        user: Address,
    ) -> Result<UserPosition> {
        let target = self.state_mut()?.pools_mut(class).get_mut(&pool)?;
        let position = target.position(&user);
        let new_amount = position
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::MathOverflow("position amount"))?;
        let total = target
            .total_deposited
            .checked_add(amount)
            .ok_or(LedgerError::MathOverflow("pool deposits"))?;
        let settled = position.settled(target.acc_reward_per_share, new_amount)?;

        target.total_deposited = total;
        target.put_position(user, settled.clone());
        debug!(%class, %pool, %user, %amount, total = %total, "Deposit");
        Ok(settled)
    }

    /// Settle pending reward, then remove `amount` from the user's position
    pub(crate) fn withdraw_from(
        &mut self,
        class: PoolClass,
        pool: Address,
        amount: Amount,
        user: Address,
    ) -> Result<UserPosition> {
        let target = self.state_mut()?.pools_mut(class).get_mut(&pool)?;
        let position = target.position(&user);
        if amount > position.amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: position.amount,
            });
        }
        let settled = position.settled(target.acc_reward_per_share, position.amount - amount)?;

        target.total_deposited -= amount;
        target.put_position(user, settled.clone());
        debug!(%class, %pool, %user, %amount, total = %target.total_deposited, "Withdraw");
        Ok(settled)
    }

    // === Rewards ===

    /// `amount * acc - debt` for an AMM LP position; does not update the pool
    pub fn pending_amm_lp_user_rewards(&self, pool: Address, user: Address) -> Result<Amount> {
        self.pending_rewards(PoolClass::Amm, pool, user)
    }

    pub fn pending_minter_lp_user_rewards(&self, pool: Address, user: Address) -> Result<Amount> {
        self.pending_rewards(PoolClass::Minter, pool, user)
    }

    pub fn pending_rewards(&self, class: PoolClass, pool: Address, user: Address) -> Result<Amount> {
        let target = self.pool(class, pool)?;
        target.position(&user).pending(target.acc_reward_per_share)
    }

    /// Pending plus settled-but-unpaid reward
    pub fn unclaimed_rewards(&self, class: PoolClass, pool: Address, user: Address) -> Result<Amount> {
        let target = self.pool(class, pool)?;
        target.position(&user).unclaimed(target.acc_reward_per_share)
    }

    pub fn unclaimed_amm_lp_rewards(&self, pool: Address, user: Address) -> Result<Amount> {
        self.unclaimed_rewards(PoolClass::Amm, pool, user)
    }

    pub fn unclaimed_minter_lp_rewards(&self, pool: Address, user: Address) -> Result<Amount> {
        self.unclaimed_rewards(PoolClass::Minter, pool, user)
    }

    pub fn claim_amm_lp_rewards(&mut self, pool: Address, user: Address) -> Result<Amount> {
        self.claim(PoolClass::Amm, pool, user)
    }

    pub fn claim_minter_lp_rewards(&mut self, pool: Address, user: Address) -> Result<Amount> {
        self.claim(PoolClass::Minter, pool, user)
    }

    /// Pay out everything the user has earned in `pool`
    pub fn claim(&mut self, class: PoolClass, pool: Address, user: Address) -> Result<Amount> {
        let state = self.state_mut()?;
        let target = state.pools_mut(class).get_mut(&pool)?;
        let position = target.position(&user);
        let mut settled = position.settled(target.acc_reward_per_share, position.amount)?;
        let payout = settled.claimable;
        settled.claimable = 0;
        settled.total_claimed = settled
            .total_claimed
            .checked_add(payout)
            .ok_or(LedgerError::MathOverflow("claimed total"))?;
        let engine_total = state
            .total_rewards_claimed
            .checked_add(payout)
            .ok_or(LedgerError::MathOverflow("claimed total"))?;

        let target = state.pools_mut(class).get_mut(&pool)?;
        target.put_position(user, settled);
        state.total_rewards_claimed = engine_total;
        debug!(%class, %pool, %user, %payout, "Rewards claimed");
        Ok(payout)
    }

    pub fn total_rewards_claimed(&self) -> Result<Amount> {
        Ok(self.state()?.total_rewards_claimed)
    }

    // === Vesting ===

    pub fn unclaimed_vesting_rewards(&self) -> Result<Amount> {
        Ok(self.state()?.unclaimed_vesting)
    }

    pub fn total_vesting_released(&self) -> Result<Amount> {
        Ok(self.state()?.total_vesting_released)
    }

    pub fn set_halo_chest(&mut self, address: Address) -> Result<()> {
        if self.halo_chest.is_some() {
            return Err(LedgerError::AlreadyWired("halo chest"));
        }
        info!(%address, "HALO chest wired");
        self.halo_chest = Some(address);
        Ok(())
    }

    pub fn halo_chest(&self) -> Option<Address> {
        self.halo_chest
    }

    /// Move the vesting bucket into the wired chest and return the amount
    pub fn release_vested_rewards(&mut self, chest: &mut HaloChest) -> Result<Amount> {
        let wired = self.halo_chest.ok_or(LedgerError::NotWired("halo chest"))?;
        if wired != chest.address() {
            return Err(LedgerError::HaloChestMismatch {
                wired,
                actual: chest.address(),
            });
        }
        let state = self.state_mut()?;
        let released = state.unclaimed_vesting;
        let total = state
            .total_vesting_released
            .checked_add(released)
            .ok_or(LedgerError::MathOverflow("vesting released"))?;
        chest.receive_vested(released)?;

        state.unclaimed_vesting = 0;
        state.total_vesting_released = total;
        info!(%released, total = %total, chest = %wired, "Vested rewards released");
        Ok(released)
    }

    // === Pool queries ===

    pub fn pool(&self, class: PoolClass, pool: Address) -> Result<&Pool> {
        self.state()?.pools(class).get(&pool)
    }

    pub fn get_amm_lp_pool_info(&self, pool: Address) -> Result<PoolInfo> {
        Ok(self.pool(PoolClass::Amm, pool)?.info())
    }

    pub fn get_minter_lp_pool_info(&self, pool: Address) -> Result<PoolInfo> {
        Ok(self.pool(PoolClass::Minter, pool)?.info())
    }

    pub fn pool_infos(&self, class: PoolClass) -> Result<Vec<PoolInfo>> {
        Ok(self.state()?.pools(class).iter().map(Pool::info).collect())
    }

    pub fn user_position(&self, class: PoolClass, pool: Address, user: Address) -> Result<UserPosition> {
        Ok(self.pool(class, pool)?.position(&user))
    }

    pub fn is_valid_amm_lp(&self, pool: Address) -> bool {
        self.state
            .as_ref()
            .map(|s| s.amm.contains(&pool))
            .unwrap_or(false)
    }

    pub fn is_valid_minter_lp(&self, pool: Address) -> bool {
        self.state
            .as_ref()
            .map(|s| s.minter.contains(&pool))
            .unwrap_or(false)
    }

    pub fn whitelisted_amm_pool_addresses(&self) -> Result<Vec<Address>> {
        Ok(self.state()?.amm.addresses())
    }

    pub fn whitelisted_minter_pool_addresses(&self) -> Result<Vec<Address>> {
        Ok(self.state()?.minter.addresses())
    }

    pub fn total_amm_allocation_points(&self) -> Result<u64> {
        Ok(self.state()?.amm.total_weight())
    }

    pub fn total_minter_allocation_points(&self) -> Result<u64> {
        Ok(self.state()?.minter.total_weight())
    }

    /// `weight / total_class_weight` in WAD
    pub fn class_weight_share(&self, class: PoolClass, pool: Address) -> Result<u128> {
        self.state()?.pools(class).weight_fraction(&pool)
    }
}

impl MinterRewards for RewardEpochEngine {
    fn rewards_address(&self) -> Address {
        self.address
    }

    fn deposit_minter(&mut self, collateral: Address, amount: Amount, user: Address) -> Result<()> {
        self.deposit_to(PoolClass::Minter, collateral, amount, user)
            .map(|_| ())
    }

    fn withdraw_minter(&mut self, collateral: Address, amount: Amount, user: Address) -> Result<()> {
        self.withdraw_from(PoolClass::Minter, collateral, amount, user)
            .map(|_| ())
    }
}

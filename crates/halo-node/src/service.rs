//! Ledger service
//!
//! Owns the reward engine, the minter ledger and the HALO chest behind a
//! single lock. Every
//! mutation runs on a copy of the state; the copy is persisted and only then
//! replaces the live state, so a failed operation or a failed save leaves
//! nothing behind.

use crate::config::LedgerConfig;
use crate::error::Result;
use halo_core::{Address, Amount, EpochIndex, PoolClass, TimeSource};
use halo_economics::{
    CollateralAccount, HaloChest, MinterLedger, PoolInfo, RewardEpochEngine, UserPosition,
};
use halo_storage::SnapshotStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Snapshot key of the ledger state
pub const SNAPSHOT_KEY: &str = "ledger";

/// Everything persisted between runs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    pub engine: RewardEpochEngine,
    pub minter: MinterLedger,
    pub chest: HaloChest,
}

impl LedgerState {
    /// Fresh, configured and wired ledger
    pub fn from_config(config: &LedgerConfig, now: i64) -> Result<Self> {
        config.validate()?;

        let mut engine = RewardEpochEngine::new(config.rewards.address);
        engine.configure(config.engine_config(now)?)?;
        let chest = HaloChest::new(config.rewards.halo_chest);
        engine.set_halo_chest(chest.address())?;

        let mut minter = MinterLedger::new(config.collateralization_ratio()?)?;
        minter.set_rewards_contract(config.minter.rewards_contract)?;
        minter.set_phm_contract(config.minter.phm_contract)?;

        Ok(Self {
            engine,
            minter,
            chest,
        })
    }
}

/// Serialized access to the ledger state
pub struct LedgerService<S: SnapshotStore> {
    state: RwLock<LedgerState>,
    store: S,
    clock: Arc<dyn TimeSource>,
}

impl<S: SnapshotStore> LedgerService<S> {
    /// Resume from the stored snapshot, or build and persist a fresh ledger
    pub fn open(config: &LedgerConfig, store: S, clock: Arc<dyn TimeSource>) -> Result<Self> {
        let state = match store.load::<LedgerState>(SNAPSHOT_KEY)? {
            Some(state) => {
                info!(
                    budget_epoch = state.engine.budget_epoch()?,
                    "Resumed ledger from snapshot"
                );
                state
            }
            None => {
                let state = LedgerState::from_config(config, clock.now())?;
                store.save(SNAPSHOT_KEY, &state)?;
                info!("Initialized new ledger");
                state
            }
        };
        Ok(Self {
            state: RwLock::new(state),
            store,
            clock,
        })
    }

    /// Open an existing snapshot only
    pub fn resume(store: S, clock: Arc<dyn TimeSource>) -> Result<Option<Self>> {
        Ok(store.load::<LedgerState>(SNAPSHOT_KEY)?.map(|state| Self {
            state: RwLock::new(state),
            store,
            clock,
        }))
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut LedgerState, i64) -> halo_core::Result<T>,
    ) -> Result<T> {
        let mut live = self.state.write();
        let mut next = live.clone();
        let out = op(&mut next, self.clock.now())?;
        self.store.save(SNAPSHOT_KEY, &next)?;
        *live = next;
        Ok(out)
    }

    fn read<T>(&self, op: impl FnOnce(&LedgerState) -> halo_core::Result<T>) -> Result<T> {
        Ok(op(&self.state.read())?)
    }

    // === Epochs ===

    pub fn current_epoch(&self) -> Result<EpochIndex> {
        let now = self.clock.now();
        self.read(|s| s.engine.current_epoch(now))
    }

    pub fn current_budget(&self) -> Result<Amount> {
        self.read(|s| s.engine.current_budget())
    }

    // === Pool updates ===

    pub fn update_amm_reward_pool(&self, pool: Address) -> Result<PoolInfo> {
        self.mutate(|s, now| s.engine.update_amm_reward_pool(pool, now))
    }

    pub fn update_minter_reward_pool(&self, pool: Address) -> Result<PoolInfo> {
        self.mutate(|s, now| s.engine.update_minter_reward_pool(pool, now))
    }

    pub fn mass_update_pools(&self) -> Result<Vec<PoolInfo>> {
        self.mutate(|s, now| s.engine.mass_update_pools(now))
    }

    // === LP positions ===

    pub fn deposit(&self, pool: Address, amount: Amount, user: Address) -> Result<UserPosition> {
        self.mutate(|s, _| s.engine.deposit(pool, amount, user))
    }

    pub fn withdraw(&self, pool: Address, amount: Amount, user: Address) -> Result<UserPosition> {
        self.mutate(|s, _| s.engine.withdraw(pool, amount, user))
    }

    // === Minter ===

    pub fn deposit_collateral(
        &self,
        collateral_amount: Amount,
        mint_amount: Amount,
        collateral: Address,
        user: Address,
    ) -> Result<CollateralAccount> {
        self.mutate(|s, _| {
            s.minter.deposit_by_collateral_address(
                collateral_amount,
                mint_amount,
                collateral,
                user,
                &mut s.engine,
            )
        })
    }

    pub fn redeem_collateral(
        &self,
        collateral_amount: Amount,
        burn_amount: Amount,
        collateral: Address,
        user: Address,
    ) -> Result<CollateralAccount> {
        self.mutate(|s, _| {
            s.minter.redeem_by_collateral_address(
                collateral_amount,
                burn_amount,
                collateral,
                user,
                &mut s.engine,
            )
        })
    }

    pub fn collateral_account(&self, user: Address, collateral: Address) -> CollateralAccount {
        self.state.read().minter.account(user, collateral)
    }

    // === Rewards ===

    pub fn pending_rewards(&self, class: PoolClass, pool: Address, user: Address) -> Result<Amount> {
        self.read(|s| s.engine.pending_rewards(class, pool, user))
    }

    pub fn unclaimed_rewards(&self, class: PoolClass, pool: Address, user: Address) -> Result<Amount> {
        self.read(|s| s.engine.unclaimed_rewards(class, pool, user))
    }

    pub fn claim(&self, class: PoolClass, pool: Address, user: Address) -> Result<Amount> {
        self.mutate(|s, _| s.engine.claim(class, pool, user))
    }

    pub fn release_vested_rewards(&self) -> Result<Amount> {
        self.mutate(|s, _| s.engine.release_vested_rewards(&mut s.chest))
    }

    // === Chest ===

    /// Stake HALO for chest shares
    pub fn enter_chest(&self, user: Address, amount: Amount) -> Result<Amount> {
        self.mutate(|s, _| s.chest.enter(user, amount))
    }

    /// Burn chest shares for HALO
    pub fn leave_chest(&self, user: Address, shares: Amount) -> Result<Amount> {
        self.mutate(|s, _| s.chest.leave(user, shares))
    }

    pub fn chest_price(&self) -> Result<u128> {
        self.read(|s| s.chest.price())
    }

    pub fn chest_shares(&self, user: Address) -> Amount {
        self.state.read().chest.shares_of(user)
    }

    // === Queries ===

    pub fn pool_info(&self, class: PoolClass, pool: Address) -> Result<PoolInfo> {
        self.read(|s| Ok(s.engine.pool(class, pool)?.info()))
    }

    pub fn pool_infos(&self, class: PoolClass) -> Result<Vec<PoolInfo>> {
        self.read(|s| s.engine.pool_infos(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use halo_core::fixed::WAD;
    use halo_core::{LedgerError, ManualClock};
    use halo_storage::StateStore;

    const START: i64 = 1_700_000_000;

    fn config() -> LedgerConfig {
        let mut config = LedgerConfig::default();
        config.rewards.start_timestamp = Some(START);
        config
    }

    fn service() -> (LedgerService<StateStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let service = LedgerService::open(&config(), StateStore::new(), clock.clone()).unwrap();
        (service, clock)
    }

    #[test]
    fn test_open_persists_fresh_ledger() {
        let (service, _) = service();
        assert!(service.store().contains(SNAPSHOT_KEY));
        assert_eq!(service.current_epoch().unwrap(), 0);
        assert_eq!(service.current_budget().unwrap(), 7_500_000 * WAD);
    }

    #[test]
    fn test_failed_mutation_leaves_state() {
        let (service, _) = service();
        let lp = config().rewards.amm_pools[0].address;
        let user = Address::repeat(0xa1);
        service.deposit(lp, 10, user).unwrap();

        let err = service.withdraw(lp, 11, user).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(service.pool_info(PoolClass::Amm, lp).unwrap().total_deposited, 10);

        let stored: LedgerState = service.store().load(SNAPSHOT_KEY).unwrap().unwrap();
        assert_eq!(
            stored.engine.get_amm_lp_pool_info(lp).unwrap().total_deposited,
            10
        );
    }

    #[test]
    fn test_clock_drives_epochs() {
        let (service, clock) = service();
        let lp = config().rewards.amm_pools[0].address;
        let user = Address::repeat(0xa1);
        service.deposit(lp, 100 * WAD, user).unwrap();

        clock.advance(31);
        assert_eq!(service.current_epoch().unwrap(), 1);
        let info = service.update_amm_reward_pool(lp).unwrap();
        assert_eq!(info.last_update_epoch, 1);
        assert_eq!(
            service.pending_rewards(PoolClass::Amm, lp, user).unwrap(),
            3_048_750 * WAD
        );
        assert_eq!(service.claim(PoolClass::Amm, lp, user).unwrap(), 3_048_750 * WAD);
    }

    #[test]
    fn test_vesting_flows_into_chest() {
        let mut config = config();
        config.rewards.amm_lp_ratio_bps = 4_000;
        config.rewards.minter_lp_ratio_bps = 4_000;
        config.rewards.vesting_ratio_bps = 2_000;
        let clock = Arc::new(ManualClock::new(START));
        let service = LedgerService::open(&config, StateStore::new(), clock.clone()).unwrap();
        let user = Address::repeat(0xa1);

        assert_eq!(service.enter_chest(user, 4_878_000 * WAD).unwrap(), 4_878_000 * WAD);
        clock.advance(31);
        service.mass_update_pools().unwrap();
        assert_eq!(service.release_vested_rewards().unwrap(), 1_219_500 * WAD);
        assert_eq!(service.chest_price().unwrap(), 5 * WAD / 4);

        let err = service.leave_chest(user, 4_878_001 * WAD).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(
            service.leave_chest(user, service.chest_shares(user)).unwrap(),
            6_097_500 * WAD
        );
        assert_eq!(service.snapshot().chest.total_shares(), 0);
    }
}

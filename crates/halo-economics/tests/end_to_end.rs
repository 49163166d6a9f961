//! Integration tests for the reward engine and minter ledger together
//!
//! These replay the deploy-and-simulate flow: configure, wire, deposit on
//! both sides, let epochs pass, update, then read and claim rewards.

use halo_core::fixed::{parse_wad, ACC_PRECISION, WAD};
use halo_core::{Address, LedgerError, PoolClass};
use halo_economics::{
    ClassRatios, HaloChest, MinterLedger, MinterRewards, PoolWeight, RewardEngineConfig,
    RewardEpochEngine,
};
use proptest::prelude::*;

const START: i64 = 1_700_000_000;
const EPOCH: u64 = 30;

fn lp_pool() -> Address {
    Address::repeat(0x11)
}

fn collateral() -> Address {
    Address::repeat(0xc0)
}

fn alice() -> Address {
    Address::repeat(0xa1)
}

fn bob() -> Address {
    Address::repeat(0xb0)
}

fn config(ratios: ClassRatios) -> RewardEngineConfig {
    RewardEngineConfig {
        initial_budget: 7_500_000 * WAD,
        decay_factor: parse_wad("0.813").unwrap(),
        epoch_length_secs: EPOCH,
        start_timestamp: START,
        ratios,
        amm_pools: vec![PoolWeight::new(lp_pool(), 10)],
        minter_pools: vec![PoolWeight::new(collateral(), 10)],
    }
}

fn deployed(ratios: ClassRatios) -> (RewardEpochEngine, MinterLedger) {
    let mut engine = RewardEpochEngine::new(Address::repeat(0xee));
    engine.configure(config(ratios)).unwrap();

    let mut minter = MinterLedger::new(parse_wad("1").unwrap()).unwrap();
    minter.set_rewards_contract(engine.rewards_address()).unwrap();
    minter.set_phm_contract(Address::repeat(0x77)).unwrap();
    (engine, minter)
}

fn at_epoch(epoch: u64) -> i64 {
    START + (epoch * EPOCH) as i64 + 1
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_two_epoch_scenario() {
        let (mut engine, mut minter) = deployed(ClassRatios::default());

        engine.deposit(lp_pool(), 100 * WAD, alice()).unwrap();
        minter
            .deposit_by_collateral_address(100 * WAD, 100 * WAD, collateral(), alice(), &mut engine)
            .unwrap();

        let now = at_epoch(2) + 5;
        let amm = engine.update_amm_reward_pool(lp_pool(), now).unwrap();
        let mint = engine.update_minter_reward_pool(collateral(), now).unwrap();

        // Budget decayed twice: 7_500_000 * 0.813^2
        let budget = engine.current_budget().unwrap();
        assert_eq!(budget, 4_957_267 * WAD + WAD / 2);
        assert_eq!(engine.budget_epoch().unwrap(), 2);

        let expected_acc = (budget / 2) * ACC_PRECISION / (100 * WAD);
        assert_eq!(amm.acc_reward_per_share, expected_acc);
        assert_eq!(mint.acc_reward_per_share, expected_acc);
        assert_eq!(amm.last_update_epoch, 2);

        // Sole depositor in each pool earns the whole class share
        assert_eq!(
            engine.pending_amm_lp_user_rewards(lp_pool(), alice()).unwrap(),
            budget / 2
        );
        assert_eq!(
            engine
                .pending_minter_lp_user_rewards(collateral(), alice())
                .unwrap(),
            budget / 2
        );
    }

    #[test]
    fn test_claim_after_scenario() {
        let (mut engine, mut minter) = deployed(ClassRatios::default());
        engine.deposit(lp_pool(), 100 * WAD, alice()).unwrap();
        minter
            .deposit_by_collateral_address(100 * WAD, 80 * WAD, collateral(), bob(), &mut engine)
            .unwrap();

        engine.mass_update_pools(at_epoch(1)).unwrap();
        let lp = engine.claim_amm_lp_rewards(lp_pool(), alice()).unwrap();
        let mint = engine.claim_minter_lp_rewards(collateral(), bob()).unwrap();

        assert_eq!(lp, 3_048_750 * WAD);
        assert_eq!(mint, 3_048_750 * WAD);
        assert_eq!(engine.total_rewards_claimed().unwrap(), 6_097_500 * WAD);

        // Nothing left until the next boundary
        assert_eq!(engine.claim_amm_lp_rewards(lp_pool(), alice()).unwrap(), 0);
    }

    #[test]
    fn test_redeem_keeps_rewards() {
        let (mut engine, mut minter) = deployed(ClassRatios::default());
        minter
            .deposit_by_collateral_address(100 * WAD, 100 * WAD, collateral(), alice(), &mut engine)
            .unwrap();
        engine.update_minter_reward_pool(collateral(), at_epoch(1)).unwrap();
        let earned = engine
            .pending_minter_lp_user_rewards(collateral(), alice())
            .unwrap();

        minter
            .redeem_by_collateral_address(100 * WAD, 100 * WAD, collateral(), alice(), &mut engine)
            .unwrap();
        assert_eq!(minter.total_collateral(collateral()), 0);
        assert_eq!(
            engine.unclaimed_minter_lp_rewards(collateral(), alice()).unwrap(),
            earned
        );
        assert_eq!(
            engine.claim_minter_lp_rewards(collateral(), alice()).unwrap(),
            earned
        );
    }

    #[test]
    fn test_vesting_bucket_fills_alongside_pools() {
        let ratios = ClassRatios {
            amm_lp_bps: 4_000,
            minter_lp_bps: 4_000,
            vesting_bps: 2_000,
        };
        let (mut engine, _) = deployed(ratios);
        engine.deposit(lp_pool(), 10 * WAD, alice()).unwrap();

        engine.update_amm_reward_pool(lp_pool(), at_epoch(1)).unwrap();
        assert_eq!(engine.unclaimed_vesting_rewards().unwrap(), 1_219_500 * WAD);
        assert_eq!(
            engine.pending_amm_lp_user_rewards(lp_pool(), alice()).unwrap(),
            2_439_000 * WAD
        );
        let mut chest = HaloChest::new(Address::repeat(0xca));
        engine.set_halo_chest(chest.address()).unwrap();
        assert_eq!(engine.release_vested_rewards(&mut chest).unwrap(), 1_219_500 * WAD);
        assert_eq!(engine.unclaimed_vesting_rewards().unwrap(), 0);
        assert_eq!(chest.halo_balance(), 1_219_500 * WAD);
    }

    #[test]
    fn test_vesting_release_raises_chest_price() {
        let ratios = ClassRatios {
            amm_lp_bps: 4_000,
            minter_lp_bps: 4_000,
            vesting_bps: 2_000,
        };
        let (mut engine, _) = deployed(ratios);
        let mut chest = HaloChest::new(Address::repeat(0xca));
        engine.set_halo_chest(chest.address()).unwrap();
        engine.deposit(lp_pool(), 10 * WAD, alice()).unwrap();
        engine.update_amm_reward_pool(lp_pool(), at_epoch(1)).unwrap();

        // Alice stakes her harvest before the vesting share lands
        let harvest = engine.claim_amm_lp_rewards(lp_pool(), alice()).unwrap();
        assert_eq!(harvest, 2_439_000 * WAD);
        let shares = chest.enter(alice(), harvest).unwrap();
        assert_eq!(chest.price().unwrap(), WAD);

        engine.release_vested_rewards(&mut chest).unwrap();
        assert_eq!(chest.price().unwrap(), parse_wad("1.5").unwrap());

        // Bob enters at the new price and owns proportionally less
        let bob_shares = chest.enter(bob(), 300 * WAD).unwrap();
        assert_eq!(bob_shares, 200 * WAD);
        assert_eq!(chest.leave(bob(), bob_shares).unwrap(), 300 * WAD);
        assert_eq!(chest.leave(alice(), shares).unwrap(), harvest + 1_219_500 * WAD);
    }

    #[test]
    fn test_minter_pool_only_moves_through_minter() {
        let (mut engine, mut minter) = deployed(ClassRatios::default());

        // The LP entry points only address AMM pools
        assert!(matches!(
            engine.deposit(collateral(), 10 * WAD, alice()),
            Err(LedgerError::UnknownPool { class: PoolClass::Amm, .. })
        ));
        assert!(matches!(
            engine.withdraw(collateral(), 10 * WAD, alice()),
            Err(LedgerError::UnknownPool { class: PoolClass::Amm, .. })
        ));
        assert_eq!(engine.get_minter_lp_pool_info(collateral()).unwrap().total_deposited, 0);

        minter
            .deposit_by_collateral_address(10 * WAD, 5 * WAD, collateral(), alice(), &mut engine)
            .unwrap();
        assert_eq!(
            engine.get_minter_lp_pool_info(collateral()).unwrap().total_deposited,
            minter.total_collateral(collateral())
        );
    }

    #[test]
    fn test_minter_rejects_engine_it_was_not_wired_to() {
        let (_, mut minter) = deployed(ClassRatios::default());
        let mut other = RewardEpochEngine::new(Address::repeat(0x99));
        other.configure(config(ClassRatios::default())).unwrap();

        let err = minter
            .deposit_by_collateral_address(10, 10, collateral(), alice(), &mut other)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::RewardsContractMismatch {
                wired: Address::repeat(0xee),
                actual: Address::repeat(0x99),
            }
        );
        assert_eq!(
            other.user_position(PoolClass::Minter, collateral(), alice()).unwrap().amount,
            0
        );
    }
}

mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn pending_never_decreases_without_withdraw(
            deposits in proptest::collection::vec(1u128..1_000, 1..6),
            steps in proptest::collection::vec(0u64..3, 1..8),
        ) {
            let (mut engine, _) = deployed(ClassRatios::default());
            for (i, amount) in deposits.iter().enumerate() {
                engine.deposit(lp_pool(), amount * WAD, Address::repeat(i as u8 + 1)).unwrap();
            }

            let mut epoch = 0;
            let mut last = 0;
            for step in steps {
                epoch += step;
                engine.update_amm_reward_pool(lp_pool(), at_epoch(epoch)).unwrap();
                // The engine budget tracks initial * decay^epoch
                prop_assert_eq!(
                    engine.current_budget().unwrap(),
                    engine.budget_at_epoch(epoch).unwrap()
                );
                prop_assert_eq!(engine.budget_epoch().unwrap(), epoch);
                let pending = engine
                    .pending_amm_lp_user_rewards(lp_pool(), Address::repeat(1))
                    .unwrap();
                prop_assert!(pending >= last);
                last = pending;
            }
        }

        #[test]
        fn pool_payouts_never_exceed_class_budget(
            deposits in proptest::collection::vec(1u128..1_000_000, 1..6),
            epoch in 1u64..20,
        ) {
            let (mut engine, _) = deployed(ClassRatios::default());
            for (i, amount) in deposits.iter().enumerate() {
                engine.deposit(lp_pool(), amount * WAD, Address::repeat(i as u8 + 1)).unwrap();
            }
            engine.update_amm_reward_pool(lp_pool(), at_epoch(epoch)).unwrap();

            let total: u128 = (0..deposits.len())
                .map(|i| {
                    engine
                        .pending_amm_lp_user_rewards(lp_pool(), Address::repeat(i as u8 + 1))
                        .unwrap()
                })
                .sum();
            let class_budget = engine.budget_at_epoch(epoch).unwrap() / 2;
            prop_assert!(total <= class_budget);
        }

        #[test]
        fn collateral_check_matches_ratio(collateral_amount in 1u128..10_000, mint in 0u128..20_000) {
            let (mut engine, mut minter) = deployed(ClassRatios::default());
            let result = minter.deposit_by_collateral_address(
                collateral_amount,
                mint,
                collateral(),
                alice(),
                &mut engine,
            );
            prop_assert_eq!(result.is_ok(), mint <= collateral_amount);
        }
    }
}

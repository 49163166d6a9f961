//! # Reward Pools
//!
//! Weighted pools grouped by class. Each class owns a fixed weight table set
//! at configuration time; a pool's share of the class budget is
//! `weight / total_weight`.

use crate::position::UserPosition;
use halo_core::fixed::{mul_div, WAD};
use halo_core::{Address, Amount, EpochIndex, LedgerError, PoolClass, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Pool entry in a configuration weight table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolWeight {
    /// LP token or collateral token address identifying the pool
    pub address: Address,
    /// Allocation points
    pub weight: u64,
}

impl PoolWeight {
    pub fn new(address: Address, weight: u64) -> Self {
        Self { address, weight }
    }
}

/// Reward pool state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub class: PoolClass,
    /// Allocation points
    pub weight: u64,
    /// Accumulated reward per deposited unit, scaled by `ACC_PRECISION`
    pub acc_reward_per_share: u128,
    /// Epoch of the last accumulator update
    pub last_update_epoch: EpochIndex,
    /// Sum of all user deposits
    pub total_deposited: Amount,
    /// Reward credited but not yet in the accumulator: shares that arrived
    /// while the pool had no deposits, plus per-share truncation dust
    pub undistributed: Amount,
    /// Per-user positions
    pub positions: BTreeMap<Address, UserPosition>,
}

impl Pool {
    fn new(address: Address, class: PoolClass, weight: u64) -> Self {
        Self {
            address,
            class,
            weight,
            acc_reward_per_share: 0,
            last_update_epoch: 0,
            total_deposited: 0,
            undistributed: 0,
            positions: BTreeMap::new(),
        }
    }

    /// Snapshot for queries
    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            address: self.address,
            class: self.class,
            weight: self.weight,
            acc_reward_per_share: self.acc_reward_per_share,
            last_update_epoch: self.last_update_epoch,
            total_deposited: self.total_deposited,
            undistributed: self.undistributed,
            depositors: self.positions.values().filter(|p| p.amount > 0).count(),
        }
    }

    /// Position of `user`, or an empty one
    pub fn position(&self, user: &Address) -> UserPosition {
        self.positions.get(user).cloned().unwrap_or_default()
    }

    /// Store a position, dropping it once it is fully empty
    pub(crate) fn put_position(&mut self, user: Address, position: UserPosition) {
        if position.is_empty() {
            self.positions.remove(&user);
        } else {
            self.positions.insert(user, position);
        }
    }
}

/// Read-only pool view returned by the pool-info getters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub address: Address,
    pub class: PoolClass,
    pub weight: u64,
    pub acc_reward_per_share: u128,
    pub last_update_epoch: EpochIndex,
    pub total_deposited: Amount,
    pub undistributed: Amount,
    pub depositors: usize,
}

/// All pools of one class
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolSet {
    class: PoolClass,
    /// Configuration order
    order: Vec<Address>,
    pools: HashMap<Address, Pool>,
    total_weight: u64,
}

impl PoolSet {
    /// Build from a weight table; empty tables, zero weights and duplicates are rejected
    pub fn from_weights(class: PoolClass, weights: &[PoolWeight]) -> Result<Self> {
        if weights.is_empty() {
            return Err(LedgerError::InvalidConfig(format!(
                "{class} pool list is empty"
            )));
        }

        let mut order = Vec::with_capacity(weights.len());
        let mut pools = HashMap::with_capacity(weights.len());
        let mut total_weight: u64 = 0;

        for entry in weights {
            if entry.weight == 0 {
                return Err(LedgerError::InvalidConfig(format!(
                    "{class} pool {} has zero weight",
                    entry.address
                )));
            }
            if pools.contains_key(&entry.address) {
                return Err(LedgerError::InvalidConfig(format!(
                    "{class} pool {} listed twice",
                    entry.address
                )));
            }
            total_weight = total_weight.checked_add(entry.weight).ok_or_else(|| {
                LedgerError::InvalidConfig(format!("{class} pool weights overflow"))
            })?;
            order.push(entry.address);
            pools.insert(entry.address, Pool::new(entry.address, class, entry.weight));
        }

        Ok(Self {
            class,
            order,
            pools,
            total_weight,
        })
    }

    pub fn class(&self) -> PoolClass {
        self.class
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.pools.contains_key(address)
    }

    /// Pool addresses in configuration order
    pub fn addresses(&self) -> Vec<Address> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pool> {
        self.order.iter().filter_map(|a| self.pools.get(a))
    }

    pub fn get(&self, address: &Address) -> Result<&Pool> {
        self.pools.get(address).ok_or(LedgerError::UnknownPool {
            class: self.class,
            pool: *address,
        })
    }

    pub(crate) fn get_mut(&mut self, address: &Address) -> Result<&mut Pool> {
        let class = self.class;
        self.pools.get_mut(address).ok_or(LedgerError::UnknownPool {
            class,
            pool: *address,
        })
    }

    /// Pool's share of `class_budget` by weight
    pub fn weighted_share(&self, address: &Address, class_budget: Amount) -> Result<Amount> {
        let pool = self.get(address)?;
        mul_div(
            class_budget,
            pool.weight as u128,
            self.total_weight as u128,
            "weighted share",
        )
    }

    /// `weight / total_weight` in WAD
    pub fn weight_fraction(&self, address: &Address) -> Result<u128> {
        self.weighted_share(address, WAD)
    }
}

//! # Collateral Minter
//!
//! Tracks collateral deposits and the PHM tokens minted against them.
//!
//! A deposit of `collateral` may mint at most `collateral / ratio`:
//!
//! ```text
//! mint_amount * collateralization_ratio <= collateral_amount
//! ```
//!
//! Every collateral movement is forwarded to the rewards engine through
//! [`MinterRewards`], which keeps the Minter-class pool balance in step with
//! the ledger.

use crate::rewards::MinterRewards;
use halo_core::fixed::{mul_div, wad_mul_up, WAD};
use halo_core::{Address, Amount, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-user balances for one collateral type
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralAccount {
    pub collateral: Amount,
    pub minted: Amount,
}

impl CollateralAccount {
    fn is_empty(&self) -> bool {
        self.collateral == 0 && self.minted == 0
    }
}

/// Aggregate balances for one collateral type
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralTotals {
    pub collateral: Amount,
    pub minted: Amount,
}

/// Minter ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinterLedger {
    /// Collateral required per minted unit, in WAD
    collateralization_ratio: u128,
    rewards_contract: Option<Address>,
    phm_contract: Option<Address>,
    /// Keyed by (user, collateral)
    accounts: BTreeMap<(Address, Address), CollateralAccount>,
    totals: BTreeMap<Address, CollateralTotals>,
}

impl MinterLedger {
    pub fn new(collateralization_ratio: u128) -> Result<Self> {
        if collateralization_ratio == 0 {
            return Err(LedgerError::InvalidConfig(
                "collateralization ratio must be positive".to_string(),
            ));
        }
        Ok(Self {
            collateralization_ratio,
            rewards_contract: None,
            phm_contract: None,
            accounts: BTreeMap::new(),
            totals: BTreeMap::new(),
        })
    }

    pub fn collateralization_ratio(&self) -> u128 {
        self.collateralization_ratio
    }

    // === Wiring ===

    pub fn set_rewards_contract(&mut self, address: Address) -> Result<()> {
        if self.rewards_contract.is_some() {
            return Err(LedgerError::AlreadyWired("rewards"));
        }
        info!(%address, "Rewards contract wired");
        self.rewards_contract = Some(address);
        Ok(())
    }

    pub fn set_phm_contract(&mut self, address: Address) -> Result<()> {
        if self.phm_contract.is_some() {
            return Err(LedgerError::AlreadyWired("phm"));
        }
        info!(%address, "PHM contract wired");
        self.phm_contract = Some(address);
        Ok(())
    }

    pub fn rewards_contract(&self) -> Option<Address> {
        self.rewards_contract
    }

    pub fn phm_contract(&self) -> Option<Address> {
        self.phm_contract
    }

    fn check_wiring<R: MinterRewards + ?Sized>(&self, rewards: &R) -> Result<()> {
        let wired = self.rewards_contract.ok_or(LedgerError::NotWired("rewards"))?;
        self.phm_contract.ok_or(LedgerError::NotWired("phm"))?;
        let actual = rewards.rewards_address();
        if wired != actual {
            return Err(LedgerError::RewardsContractMismatch { wired, actual });
        }
        Ok(())
    }

    /// Rounded up, so a fractional requirement is never waived
    fn required_collateral(&self, minted: Amount) -> Result<Amount> {
        wad_mul_up(minted, self.collateralization_ratio, "required collateral")
    }

    // === Deposits ===

    /// Lock collateral and mint against it
    pub fn deposit_by_collateral_address<R: MinterRewards + ?Sized>(
        &mut self,
        collateral_amount: Amount,
        mint_amount: Amount,
        collateral: Address,
        user: Address,
        rewards: &mut R,
    ) -> Result<CollateralAccount> {
        self.check_wiring(rewards)?;

        let required = self.required_collateral(mint_amount)?;
        if required > collateral_amount {
            return Err(LedgerError::InsufficientCollateral {
                required,
                provided: collateral_amount,
            });
        }

        let mut account = self.account(user, collateral);
        account.collateral = account
            .collateral
            .checked_add(collateral_amount)
            .ok_or(LedgerError::MathOverflow("collateral balance"))?;
        account.minted = account
            .minted
            .checked_add(mint_amount)
            .ok_or(LedgerError::MathOverflow("minted balance"))?;

        let mut totals = self.totals.get(&collateral).cloned().unwrap_or_default();
        totals.collateral = totals
            .collateral
            .checked_add(collateral_amount)
            .ok_or(LedgerError::MathOverflow("collateral total"))?;
        totals.minted = totals
            .minted
            .checked_add(mint_amount)
            .ok_or(LedgerError::MathOverflow("minted total"))?;

        // Rewards side validates the collateral pool; nothing is written here on failure
        rewards.deposit_minter(collateral, collateral_amount, user)?;

        self.accounts.insert((user, collateral), account.clone());
        self.totals.insert(collateral, totals);
        debug!(%user, %collateral, %collateral_amount, %mint_amount, "Collateral deposited");
        Ok(account)
    }

    /// Burn minted tokens and release collateral
    pub fn redeem_by_collateral_address<R: MinterRewards + ?Sized>(
        &mut self,
        collateral_amount: Amount,
        burn_amount: Amount,
        collateral: Address,
        user: Address,
        rewards: &mut R,
    ) -> Result<CollateralAccount> {
        self.check_wiring(rewards)?;

        let mut account = self.account(user, collateral);
        if collateral_amount > account.collateral {
            return Err(LedgerError::InsufficientBalance {
                requested: collateral_amount,
                available: account.collateral,
            });
        }
        if burn_amount > account.minted {
            return Err(LedgerError::InsufficientBalance {
                requested: burn_amount,
                available: account.minted,
            });
        }
        account.collateral -= collateral_amount;
        account.minted -= burn_amount;

        let required = self.required_collateral(account.minted)?;
        if required > account.collateral {
            return Err(LedgerError::InsufficientCollateral {
                required,
                provided: account.collateral,
            });
        }

        let mut totals = self.totals.get(&collateral).cloned().unwrap_or_default();
        totals.collateral = totals.collateral.saturating_sub(collateral_amount);
        totals.minted = totals.minted.saturating_sub(burn_amount);

        rewards.withdraw_minter(collateral, collateral_amount, user)?;

        if account.is_empty() {
            self.accounts.remove(&(user, collateral));
        } else {
            self.accounts.insert((user, collateral), account.clone());
        }
        self.totals.insert(collateral, totals);
        debug!(%user, %collateral, %collateral_amount, %burn_amount, "Collateral redeemed");
        Ok(account)
    }

    // === Queries ===

    pub fn account(&self, user: Address, collateral: Address) -> CollateralAccount {
        self.accounts
            .get(&(user, collateral))
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_collateral(&self, collateral: Address) -> Amount {
        self.totals
            .get(&collateral)
            .map(|t| t.collateral)
            .unwrap_or(0)
    }

    pub fn total_minted(&self, collateral: Address) -> Amount {
        self.totals.get(&collateral).map(|t| t.minted).unwrap_or(0)
    }

    /// Largest amount `user` could mint right now without adding collateral
    pub fn available_to_mint(&self, user: Address, collateral: Address) -> Result<Amount> {
        let account = self.account(user, collateral);
        let capacity = mul_div(
            account.collateral,
            WAD,
            self.collateralization_ratio,
            "mint capacity",
        )?;
        Ok(capacity.saturating_sub(account.minted))
    }
}

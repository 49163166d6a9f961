//! # HALO Chest
//!
//! Share ledger for staked HALO. `enter` locks HALO and mints HALOHALO
//! shares at the current price; `leave` burns shares for their part of the
//! chest balance.
//!
//! Vested rewards are added to the balance without minting shares, which
//! raises the price of every outstanding share:
//!
//! ```text
//! price = halo_balance / total_shares
//! ```

use halo_core::fixed::{mul_div, mul_div_up, WAD};
use halo_core::{Address, Amount, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// HALOHALO share ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HaloChest {
    address: Address,
    /// HALO held for all shareholders
    halo_balance: Amount,
    total_shares: Amount,
    shares: BTreeMap<Address, Amount>,
    /// Lifetime vested rewards received
    total_vested: Amount,
}

impl HaloChest {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            halo_balance: 0,
            total_shares: 0,
            shares: BTreeMap::new(),
            total_vested: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Lock `amount` HALO for shares; returns the shares minted
    ///
    /// An empty chest mints 1:1.
    pub fn enter(&mut self, user: Address, amount: Amount) -> Result<Amount> {
        let minted = if self.total_shares == 0 || self.halo_balance == 0 {
            amount
        } else {
            mul_div(amount, self.total_shares, self.halo_balance, "chest shares")?
        };
        if minted == 0 && amount > 0 {
            return Err(LedgerError::BelowMinimum {
                amount,
                minimum: mul_div_up(1, self.halo_balance, self.total_shares, "share price")?,
            });
        }

        let balance = self
            .halo_balance
            .checked_add(amount)
            .ok_or(LedgerError::MathOverflow("chest balance"))?;
        let total = self
            .total_shares
            .checked_add(minted)
            .ok_or(LedgerError::MathOverflow("chest shares"))?;
        let held = self
            .shares_of(user)
            .checked_add(minted)
            .ok_or(LedgerError::MathOverflow("chest shares"))?;

        self.halo_balance = balance;
        self.total_shares = total;
        if held > 0 {
            self.shares.insert(user, held);
        }
        debug!(%user, %amount, shares = %minted, "Entered chest");
        Ok(minted)
    }

    /// Burn `shares` and return the HALO they are worth
    pub fn leave(&mut self, user: Address, shares: Amount) -> Result<Amount> {
        let held = self.shares_of(user);
        if shares > held {
            return Err(LedgerError::InsufficientBalance {
                requested: shares,
                available: held,
            });
        }
        if shares == 0 {
            return Ok(0);
        }
        let payout = mul_div(shares, self.halo_balance, self.total_shares, "chest payout")?;

        self.halo_balance -= payout;
        self.total_shares -= shares;
        if held == shares {
            self.shares.remove(&user);
        } else {
            self.shares.insert(user, held - shares);
        }
        debug!(%user, %shares, %payout, "Left chest");
        Ok(payout)
    }

    /// Add vested HALO to the chest without minting shares
    pub fn receive_vested(&mut self, amount: Amount) -> Result<()> {
        let balance = self
            .halo_balance
            .checked_add(amount)
            .ok_or(LedgerError::MathOverflow("chest balance"))?;
        let total = self
            .total_vested
            .checked_add(amount)
            .ok_or(LedgerError::MathOverflow("chest vested total"))?;
        self.halo_balance = balance;
        self.total_vested = total;
        info!(%amount, balance = %balance, "Vested rewards received by chest");
        Ok(())
    }

    /// HALO per share in WAD; 1.0 while no shares exist
    pub fn price(&self) -> Result<u128> {
        if self.total_shares == 0 {
            return Ok(WAD);
        }
        mul_div(self.halo_balance, WAD, self.total_shares, "share price")
    }

    pub fn shares_of(&self, user: Address) -> Amount {
        self.shares.get(&user).copied().unwrap_or(0)
    }

    /// HALO `user` would receive by leaving with every share
    pub fn halo_of(&self, user: Address) -> Result<Amount> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        mul_div(self.shares_of(user), self.halo_balance, self.total_shares, "chest payout")
    }

    pub fn halo_balance(&self) -> Amount {
        self.halo_balance
    }

    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    pub fn total_vested(&self) -> Amount {
        self.total_vested
    }

    pub fn holders(&self) -> usize {
        self.shares.len()
    }
}

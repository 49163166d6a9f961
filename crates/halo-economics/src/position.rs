//! Per-user pool positions

use halo_core::fixed::{mul_div, ACC_PRECISION};
use halo_core::{Amount, LedgerError, Result};
use serde::{Deserialize, Serialize};

/// A user's stake in one pool
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Deposited amount
    pub amount: Amount,
    /// `amount * acc` already accounted for, in reward units
    pub reward_debt: Amount,
    /// Settled but not yet paid reward
    pub claimable: Amount,
    /// Lifetime rewards paid out
    pub total_claimed: Amount,
}

impl UserPosition {
    /// Reward accrued since the last settlement at accumulator `acc`
    pub fn pending(&self, acc: u128) -> Result<Amount> {
        let accrued = mul_div(self.amount, acc, ACC_PRECISION, "pending reward")?;
        Ok(accrued.saturating_sub(self.reward_debt))
    }

    /// Pending plus already settled reward
    pub fn unclaimed(&self, acc: u128) -> Result<Amount> {
        self.pending(acc)?
            .checked_add(self.claimable)
            .ok_or(LedgerError::MathOverflow("unclaimed reward"))
    }

    /// Position after settling pending reward and moving the balance to `new_amount`
    pub fn settled(&self, acc: u128, new_amount: Amount) -> Result<Self> {
        let claimable = self.unclaimed(acc)?;
        Ok(Self {
            amount: new_amount,
            reward_debt: mul_div(new_amount, acc, ACC_PRECISION, "reward debt")?,
            claimable,
            total_claimed: self.total_claimed,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.reward_debt == 0 && self.claimable == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_uses_debt() {
        let position = UserPosition {
            amount: 100,
            reward_debt: 50,
            ..Default::default()
        };
        // 100 * 2.0 = 200, minus 50 already accounted
        assert_eq!(position.pending(2 * ACC_PRECISION).unwrap(), 150);
    }

    #[test]
    fn test_settle_moves_pending_to_claimable() {
        let position = UserPosition {
            amount: 100,
            ..Default::default()
        };
        let settled = position.settled(3 * ACC_PRECISION, 40).unwrap();
        assert_eq!(settled.claimable, 300);
        assert_eq!(settled.amount, 40);
        assert_eq!(settled.reward_debt, 120);
        assert_eq!(settled.pending(3 * ACC_PRECISION).unwrap(), 0);
        assert_eq!(settled.unclaimed(3 * ACC_PRECISION).unwrap(), 300);
    }

    #[test]
    fn test_empty_position() {
        assert!(UserPosition::default().is_empty());
        let with_history = UserPosition {
            total_claimed: 10,
            ..Default::default()
        };
        assert!(with_history.is_empty());
    }
}

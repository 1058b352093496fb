// Signature reward distribution

use crate::identity::AccountId;
use crate::registry::Amount;
use serde::{Deserialize, Serialize};

/// Where the rounding remainder of a reward split goes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemainderPolicy {
    /// The destination chain's door account
    #[default]
    Door,
    /// A fixed account
    Account(AccountId),
}

impl RemainderPolicy {
    pub fn resolve(&self, door: &AccountId) -> AccountId {
        match self {
            RemainderPolicy::Door => *door,
            RemainderPolicy::Account(account) => *account,
        }
    }
}

/// Result of splitting a reward pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardSplit {
    /// One share per contributing reward account
    pub shares: Vec<(AccountId, Amount)>,
    /// Rounding remainder and who receives it
    pub remainder: Option<(AccountId, Amount)>,
}

impl RewardSplit {
    /// Total credited to `account` by this split
    pub fn credited_to(&self, account: &AccountId) -> i64 {
        let shares: i64 = self
            .shares
            .iter()
            .filter(|(a, _)| a == account)
            .map(|(_, amount)| amount.value())
            .sum();
        let remainder = match &self.remainder {
            Some((a, amount)) if a == account => amount.value(),
            _ => 0,
        };
        shares + remainder
    }

    /// Every credit, shares first
    pub fn credits(&self) -> impl Iterator<Item = &(AccountId, Amount)> {
        self.shares.iter().chain(self.remainder.iter())
    }
}

/// Split `pool` evenly across `recipients`, rounding down; the remainder
/// goes to `remainder_to`. With no recipients the whole pool is remainder.
pub fn split_reward(pool: &Amount, recipients: &[AccountId], remainder_to: AccountId) -> RewardSplit {
    if recipients.is_empty() {
        return RewardSplit {
            shares: Vec::new(),
            remainder: pool.is_positive().then(|| (remainder_to, pool.clone())),
        };
    }

    let count = recipients.len() as i64;
    let share = pool.value() / count;
    let leftover = pool.value() - share * count;

    RewardSplit {
        shares: recipients
            .iter()
            .map(|account| (*account, pool.with_value(share)))
            .filter(|(_, amount)| amount.is_positive())
            .collect(),
        remainder: (leftover > 0).then(|| (remainder_to, pool.with_value(leftover))),
    }
}

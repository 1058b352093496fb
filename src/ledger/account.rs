// Account root - per-account state on one chain

use crate::identity::AccountId;
use crate::registry::Asset;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// State of one account on one chain
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccountRoot {
    balances: HashMap<Asset, i64>,
    deposit_auth: bool,
    preauthorized: BTreeSet<AccountId>,
    transfer_rate: u32,
}

impl AccountRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, asset: &Asset) -> i64 {
        self.balances.get(asset).copied().unwrap_or(0)
    }

    pub(crate) fn adjust(&mut self, asset: &Asset, delta: i64) {
        *self.balances.entry(asset.clone()).or_insert(0) += delta;
    }

    pub fn deposit_auth(&self) -> bool {
        self.deposit_auth
    }

    pub(crate) fn set_deposit_auth(&mut self, enabled: bool) {
        self.deposit_auth = enabled;
    }

    pub fn is_preauthorized(&self, sender: &AccountId) -> bool {
        self.preauthorized.contains(sender)
    }

    pub(crate) fn preauthorize(&mut self, sender: AccountId) {
        self.preauthorized.insert(sender);
    }

    pub(crate) fn unauthorize(&mut self, sender: &AccountId) -> bool {
        self.preauthorized.remove(sender)
    }

    pub fn transfer_rate(&self) -> u32 {
        self.transfer_rate
    }

    pub(crate) fn set_transfer_rate(&mut self, rate: u32) {
        self.transfer_rate = rate;
    }

    /// Every non-zero balance held
    pub fn balances(&self) -> impl Iterator<Item = (&Asset, i64)> {
        self.balances.iter().filter(|(_, v)| **v != 0).map(|(a, v)| (a, *v))
    }
}

// Bridge definitions

use crate::identity::AccountId;
use crate::registry::{Amount, Asset, SignerList};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two ledgers a door, asset, or transaction lives on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainSide {
    Locking,
    Issuing,
}

impl ChainSide {
    /// The other chain
    pub fn opposite(self) -> Self {
        match self {
            ChainSide::Locking => ChainSide::Issuing,
            ChainSide::Issuing => ChainSide::Locking,
        }
    }
}

impl fmt::Display for ChainSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainSide::Locking => write!(f, "locking"),
            ChainSide::Issuing => write!(f, "issuing"),
        }
    }
}

/// Identity of a bridge: both doors and both assets
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BridgeKey {
    pub locking_door: AccountId,
    pub locking_asset: Asset,
    pub issuing_door: AccountId,
    pub issuing_asset: Asset,
}

impl BridgeKey {
    pub fn new(
        locking_door: AccountId,
        locking_asset: Asset,
        issuing_door: AccountId,
        issuing_asset: Asset,
    ) -> Self {
        Self {
            locking_door,
            locking_asset,
            issuing_door,
            issuing_asset,
        }
    }

    pub fn door(&self, side: ChainSide) -> &AccountId {
        match side {
            ChainSide::Locking => &self.locking_door,
            ChainSide::Issuing => &self.issuing_door,
        }
    }

    pub fn asset(&self, side: ChainSide) -> &Asset {
        match side {
            ChainSide::Locking => &self.locking_asset,
            ChainSide::Issuing => &self.issuing_asset,
        }
    }

    /// Both sides move the native coin
    pub fn is_native(&self) -> bool {
        self.locking_asset.is_native() && self.issuing_asset.is_native()
    }

    /// Canonical bytes, used for signing and storage keys
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }
}

impl fmt::Display for BridgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{}",
            self.locking_door, self.locking_asset, self.issuing_door, self.issuing_asset
        )
    }
}

/// Registration request for a new bridge
#[derive(Clone, Debug)]
pub struct BridgeSpec {
    pub key: BridgeKey,
    pub signature_reward: Amount,
    pub min_account_create: Option<Amount>,
    pub signers: SignerList,
}

/// A modify request. Only the reward and the account-create minimum can change.
#[derive(Clone, Debug, Default)]
pub struct BridgeModification {
    pub signature_reward: Option<Amount>,
    pub min_account_create: Option<Amount>,
    /// Disable account-create transfers; cannot be combined with `min_account_create`
    pub clear_account_create: bool,
}

impl BridgeModification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature_reward(mut self, reward: Amount) -> Self {
        self.signature_reward = Some(reward);
        self
    }

    pub fn with_min_account_create(mut self, min: Amount) -> Self {
        self.min_account_create = Some(min);
        self
    }

    pub fn with_clear_account_create(mut self) -> Self {
        self.clear_account_create = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.signature_reward.is_none()
            && self.min_account_create.is_none()
            && !self.clear_account_create
    }
}

/// A registered bridge
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bridge {
    key: BridgeKey,
    signature_reward: Amount,
    min_account_create: Option<Amount>,
    signers: SignerList,
}

impl Bridge {
    pub(crate) fn from_spec(spec: BridgeSpec) -> Self {
        Self {
            key: spec.key,
            signature_reward: spec.signature_reward,
            min_account_create: spec.min_account_create,
            signers: spec.signers,
        }
    }

    pub fn key(&self) -> &BridgeKey {
        &self.key
    }

    pub fn signature_reward(&self) -> &Amount {
        &self.signature_reward
    }

    /// `None` means account-create transfers are disabled
    pub fn min_account_create(&self) -> Option<&Amount> {
        self.min_account_create.as_ref()
    }

    pub fn signers(&self) -> &SignerList {
        &self.signers
    }

    pub fn door(&self, side: ChainSide) -> &AccountId {
        self.key.door(side)
    }

    pub fn asset(&self, side: ChainSide) -> &Asset {
        self.key.asset(side)
    }

    pub(crate) fn set_signature_reward(&mut self, reward: Amount) {
        self.signature_reward = reward;
    }

    pub(crate) fn set_min_account_create(&mut self, min: Option<Amount>) {
        self.min_account_create = min;
    }

    pub(crate) fn set_signers(&mut self, signers: SignerList) {
        self.signers = signers;
    }
}

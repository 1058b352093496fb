// Bridge Registry - register and modify bridges

use crate::error::ErrorClass;
use crate::ledger::AccountState;
use crate::registry::{
    Amount, Bridge, BridgeKey, BridgeModification, BridgeSpec, SignerList, SignerListError,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from bridge registration and modification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Door accounts must differ")]
    EqualDoorAccounts,

    #[error("Asset shapes do not match: {0}")]
    MismatchedAssets(String),

    #[error("Issued asset on the issuing chain must be issued by its door")]
    IssuerNotDoor,

    #[error("Invalid signature reward: {0}")]
    BadReward(String),

    #[error("Signature reward must stay in {expected}")]
    WrongRewardCurrency { expected: String },

    #[error("Invalid minimum account-create amount: {0}")]
    BadMinAccountCreate(String),

    #[error("Invalid signer list: {0}")]
    BadSignerList(#[from] SignerListError),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("A bridge already uses this door/asset pair")]
    BridgeExists,

    #[error("No such bridge")]
    NoSuchBridge,
}

impl RegistryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RegistryError::BridgeExists => ErrorClass::Policy,
            RegistryError::NoSuchBridge => ErrorClass::Referential,
            _ => ErrorClass::Malformed,
        }
    }
}

/// Table of bridges keyed by door/asset pair
#[derive(Debug, Default)]
pub struct BridgeRegistry {
    bridges: BTreeMap<BridgeKey, Bridge>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn get(&self, key: &BridgeKey) -> Option<&Bridge> {
        self.bridges.get(key)
    }

    /// Look up a bridge, failing with `NoSuchBridge`
    pub fn bridge(&self, key: &BridgeKey) -> Result<&Bridge, RegistryError> {
        self.bridges.get(key).ok_or(RegistryError::NoSuchBridge)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bridge> {
        self.bridges.values()
    }

    /// Register a new bridge.
    ///
    /// `locking` and `issuing` answer account questions (master account,
    /// issuer transfer rates) for the respective chains.
    pub fn register(
        &mut self,
        spec: BridgeSpec,
        locking: &dyn AccountState,
        issuing: &dyn AccountState,
    ) -> Result<Bridge, RegistryError> {
        let key = &spec.key;

        if key.locking_door == key.issuing_door {
            return Err(RegistryError::EqualDoorAccounts);
        }

        match (key.locking_asset.is_native(), key.issuing_asset.is_native()) {
            (true, true) => {}
            (true, false) => {
                return Err(RegistryError::MismatchedAssets(
                    "native locking asset requires a native issuing asset".into(),
                ));
            }
            (false, true) => {
                if key.issuing_door != issuing.master_account() {
                    return Err(RegistryError::MismatchedAssets(
                        "native issuing asset requires the issuing door to be the master account"
                            .into(),
                    ));
                }
            }
            (false, false) => {
                if key.issuing_asset.issuer() != Some(&key.issuing_door) {
                    return Err(RegistryError::IssuerNotDoor);
                }
            }
        }

        Self::check_reward(&spec.signature_reward, locking, issuing)?;
        if let Some(min) = &spec.min_account_create {
            Self::check_min_account_create(key, min)?;
        }

        let conflicting = self.bridges.keys().any(|existing| {
            existing == key
                || (existing.locking_door == key.locking_door
                    && existing.locking_asset == key.locking_asset)
                || (existing.issuing_door == key.issuing_door
                    && existing.issuing_asset == key.issuing_asset)
        });
        if conflicting {
            return Err(RegistryError::BridgeExists);
        }

        let bridge = Bridge::from_spec(spec);
        info!(
            bridge = %bridge.key(),
            reward = %bridge.signature_reward(),
            signers = bridge.signers().len(),
            quorum = bridge.signers().quorum(),
            "bridge registered"
        );
        self.bridges.insert(bridge.key().clone(), bridge.clone());
        Ok(bridge)
    }

    /// Change the reward and/or the account-create minimum of a bridge
    pub fn modify(
        &mut self,
        key: &BridgeKey,
        modification: BridgeModification,
        locking: &dyn AccountState,
        issuing: &dyn AccountState,
    ) -> Result<Bridge, RegistryError> {
        if modification.is_empty() {
            return Err(RegistryError::Malformed("nothing to modify".into()));
        }
        if modification.clear_account_create && modification.min_account_create.is_some() {
            return Err(RegistryError::Malformed(
                "cannot both clear and set the account-create minimum".into(),
            ));
        }

        let current = self.bridge(key)?;

        if let Some(reward) = &modification.signature_reward {
            if reward.asset() != current.signature_reward().asset() {
                return Err(RegistryError::WrongRewardCurrency {
                    expected: current.signature_reward().asset().to_string(),
                });
            }
            Self::check_reward(reward, locking, issuing)?;
        }
        if let Some(min) = &modification.min_account_create {
            Self::check_min_account_create(key, min)?;
        }

        let bridge = self.bridges.get_mut(key).ok_or(RegistryError::NoSuchBridge)?;
        if let Some(reward) = modification.signature_reward {
            bridge.set_signature_reward(reward);
        }
        if modification.clear_account_create {
            bridge.set_min_account_create(None);
        } else if let Some(min) = modification.min_account_create {
            bridge.set_min_account_create(Some(min));
        }

        info!(
            bridge = %key,
            reward = %bridge.signature_reward(),
            account_create = bridge.min_account_create().is_some(),
            "bridge modified"
        );
        Ok(bridge.clone())
    }

    /// Replace the witness signer list of a bridge, returning the new version
    pub fn set_signer_list(
        &mut self,
        key: &BridgeKey,
        signers: SignerList,
    ) -> Result<u64, RegistryError> {
        let bridge = self.bridges.get_mut(key).ok_or(RegistryError::NoSuchBridge)?;
        let next = bridge.signers().superseded_by(signers);
        let version = next.version();
        debug!(bridge = %key, version, signers = next.len(), "signer list replaced");
        bridge.set_signers(next);
        Ok(version)
    }

    fn check_reward(
        reward: &Amount,
        locking: &dyn AccountState,
        issuing: &dyn AccountState,
    ) -> Result<(), RegistryError> {
        if !reward.is_positive() {
            return Err(RegistryError::BadReward(format!(
                "must be positive, got {}",
                reward.value()
            )));
        }
        if let Some(issuer) = reward.asset().issuer() {
            if locking.transfer_rate(issuer) != 0 || issuing.transfer_rate(issuer) != 0 {
                return Err(RegistryError::BadReward(
                    "issuer charges a transfer fee".into(),
                ));
            }
        }
        Ok(())
    }

    fn check_min_account_create(key: &BridgeKey, min: &Amount) -> Result<(), RegistryError> {
        if !key.is_native() {
            return Err(RegistryError::BadMinAccountCreate(
                "account create requires a native bridge".into(),
            ));
        }
        if !min.is_native() || !min.is_positive() {
            return Err(RegistryError::BadMinAccountCreate(format!(
                "must be a positive native amount, got {}",
                min
            )));
        }
        Ok(())
    }
}


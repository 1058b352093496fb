// Assets and amounts moved across a bridge

use crate::identity::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An asset held on one chain: the chain's native coin, or an issued token
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Issued { currency: String, issuer: AccountId },
}

impl Asset {
    /// Create an issued asset
    pub fn issued(currency: &str, issuer: AccountId) -> Self {
        Asset::Issued {
            currency: currency.to_string(),
            issuer,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// The issuer of an issued asset
    pub fn issuer(&self) -> Option<&AccountId> {
        match self {
            Asset::Native => None,
            Asset::Issued { issuer, .. } => Some(issuer),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "NATIVE"),
            Asset::Issued { currency, issuer } => write!(f, "{}/{}", currency, issuer),
        }
    }
}

/// A signed quantity of an asset.
///
/// Native values are in drops. The value is signed so that malformed
/// (negative) input can be represented and rejected rather than wrapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    asset: Asset,
    value: i64,
}

impl Amount {
    pub fn new(asset: Asset, value: i64) -> Self {
        Self { asset, value }
    }

    /// Native amount in drops
    pub fn native(value: i64) -> Self {
        Self::new(Asset::Native, value)
    }

    pub fn issued(currency: &str, issuer: AccountId, value: i64) -> Self {
        Self::new(Asset::issued(currency, issuer), value)
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_native(&self) -> bool {
        self.asset.is_native()
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    /// Same asset, different value
    pub fn with_value(&self, value: i64) -> Self {
        Self::new(self.asset.clone(), value)
    }

    /// Add two amounts of the same asset
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        if self.asset != other.asset {
            return None;
        }
        self.value.checked_add(other.value).map(|v| self.with_value(v))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.asset)
    }
}

use crate::identity::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

const ACCOUNT_PREFIX: char = 'x';
const ACCOUNT_ID_LEN: usize = 20;

#[derive(Error, Debug)]
pub enum AccountIdError {
    #[error("Invalid account format: {0}")]
    InvalidFormat(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),
}

/// Ledger account identifier: `x<base58(first 20 bytes of SHA256(public key))>`
///
/// The same identifier names an account on either chain; an account existing
/// on one chain says nothing about the other.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId([u8; ACCOUNT_ID_LEN]);

impl AccountId {
    /// Derive an account ID from a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = Sha256::digest(public_key.as_bytes());
        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        bytes.copy_from_slice(&digest[..ACCOUNT_ID_LEN]);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Parse the textual form produced by `Display`
    pub fn parse(s: &str) -> Result<Self, AccountIdError> {
        let key_part = s
            .strip_prefix(ACCOUNT_PREFIX)
            .ok_or_else(|| AccountIdError::InvalidFormat(format!("missing '{}' prefix", ACCOUNT_PREFIX)))?;

        let decoded = bs58::decode(key_part)
            .into_vec()
            .map_err(|e| AccountIdError::InvalidBase58(e.to_string()))?;

        let bytes: [u8; ACCOUNT_ID_LEN] = decoded.as_slice().try_into().map_err(|_| {
            AccountIdError::InvalidFormat(format!(
                "expected {} bytes, got {}",
                ACCOUNT_ID_LEN,
                decoded.len()
            ))
        })?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ACCOUNT_PREFIX, bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

// WitnessStore - a witness's local sled database
//
// Holds an audit log of the attestations a witness has issued. Nothing in it
// is needed to attest again: attestations are re-derived from chain history.

use crate::claims::ClaimKey;
use crate::witness::{Attestation, AttestationCodec};
use std::path::Path;
use thiserror::Error;

mod keys {
    pub const ATTESTATION_PREFIX: &[u8] = b"attestation:";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Persistent attestation log
pub struct WitnessStore {
    db: sled::Db,
}

impl WitnessStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Record an issued attestation, replacing any earlier one for its key
    pub fn record(&self, attestation: &Attestation) -> Result<(), StoreError> {
        let bytes = AttestationCodec::encode(attestation)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.db.insert(Self::key(attestation.key()), bytes)?;
        Ok(())
    }

    /// Last attestation issued for a key
    pub fn get(&self, key: &ClaimKey) -> Result<Option<Attestation>, StoreError> {
        match self.db.get(Self::key(key))? {
            Some(bytes) => AttestationCodec::decode(&bytes)
                .map(Some)
                .map_err(|e| StoreError::DeserializationFailed(e.to_string())),
            None => Ok(None),
        }
    }

    /// Every attestation in the log
    pub fn all(&self) -> Result<Vec<Attestation>, StoreError> {
        let mut out = Vec::new();
        for result in self.db.scan_prefix(keys::ATTESTATION_PREFIX) {
            let (_, bytes) = result?;
            out.push(
                AttestationCodec::decode(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?,
            );
        }
        Ok(out)
    }

    fn key(key: &ClaimKey) -> Vec<u8> {
        [keys::ATTESTATION_PREFIX, &key.to_bytes()].concat()
    }
}

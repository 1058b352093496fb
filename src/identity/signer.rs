use crate::identity::{Keypair, PublicKey};
use ed25519_dalek::{Signature as DalekSignature, Signer as DalekSigner, Verifier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Attestation signature must be 64 bytes, got {0}")]
pub struct SignatureLengthError(pub usize);

/// Detached ed25519 signature carried by an attestation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Signature(DalekSignature);

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureLengthError> {
        let raw: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignatureLengthError(bytes.len()))?;
        Ok(Self(DalekSignature::from_bytes(&raw)))
    }
}

impl TryFrom<Vec<u8>> for Signature {
    type Error = SignatureLengthError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(&bytes)
    }
}

impl From<Signature> for Vec<u8> {
    fn from(signature: Signature) -> Self {
        signature.to_bytes().to_vec()
    }
}

/// Signs and checks attestation bytes
pub struct Signer;

impl Signer {
    pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
        Signature(keypair.signing_key().sign(message))
    }

    /// True when `signature` over `message` was made by `public_key`
    pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        public_key.inner().verify(message, &signature.0).is_ok()
    }
}

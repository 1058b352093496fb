// Attestation - a witness's signed statement about a source-chain commitment

use crate::claims::{ClaimKey, ClaimRef};
use crate::identity::{AccountId, Keypair, PublicKey, Signature, Signer};
use crate::ledger::Commitment;
use crate::registry::{Amount, ChainSide};
use crate::witness::CodecError;
use serde::{Deserialize, Serialize};

/// The attested facts that signers must agree on for their weights to add up
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttestedValue {
    pub sender: AccountId,
    pub amount: Amount,
    pub destination: Option<AccountId>,
    pub signature_reward: Option<Amount>,
    pub was_locking_chain_send: bool,
}

/// Every signed field of an attestation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationBody {
    pub key: ClaimKey,
    pub value: AttestedValue,
    pub signer: AccountId,
    pub public_key: PublicKey,
    pub reward_account: AccountId,
}

impl AttestationBody {
    /// Describe a commitment as seen by `signer`
    pub fn from_commitment(
        commitment: &Commitment,
        keypair: &Keypair,
        reward_account: AccountId,
    ) -> Self {
        let public_key = keypair.public_key();
        Self {
            key: ClaimKey::new(
                commitment.bridge.clone(),
                commitment.source.opposite(),
                commitment.reference,
            ),
            value: AttestedValue {
                sender: commitment.sender,
                amount: commitment.amount.clone(),
                destination: commitment.destination,
                signature_reward: commitment.signature_reward.clone(),
                was_locking_chain_send: commitment.source == ChainSide::Locking,
            },
            signer: AccountId::from_public_key(&public_key),
            public_key,
            reward_account,
        }
    }

    /// Deterministic bytes covered by the signature
    pub fn to_signing_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let encoded =
            postcard::to_allocvec(self).map_err(|e| CodecError::EncodeError(e.to_string()))?;
        let mut bytes = b"xchain-attestation:".to_vec();
        bytes.extend(encoded);
        Ok(bytes)
    }

    pub fn sign(self, keypair: &Keypair) -> Result<Attestation, CodecError> {
        let signature = Signer::sign(keypair, &self.to_signing_bytes()?);
        Ok(Attestation {
            body: self,
            signature,
        })
    }
}

/// A signed attestation. Immutable once issued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    body: AttestationBody,
    signature: Signature,
}

impl Attestation {
    pub fn from_parts(body: AttestationBody, signature: Signature) -> Self {
        Self { body, signature }
    }

    pub fn body(&self) -> &AttestationBody {
        &self.body
    }

    pub fn key(&self) -> &ClaimKey {
        &self.body.key
    }

    pub fn reference(&self) -> ClaimRef {
        self.body.key.reference
    }

    pub fn value(&self) -> &AttestedValue {
        &self.body.value
    }

    pub fn signer(&self) -> &AccountId {
        &self.body.signer
    }

    pub fn reward_account(&self) -> &AccountId {
        &self.body.reward_account
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Signature is valid, the key derives the signer account, and the
    /// direction flag agrees with the destination chain
    pub fn verify(&self) -> bool {
        let body = &self.body;
        let direction_ok =
            body.value.was_locking_chain_send == (body.key.destination == ChainSide::Issuing);
        direction_ok
            && AccountId::from_public_key(&body.public_key) == body.signer
            && body
                .to_signing_bytes()
                .map(|bytes| Signer::verify(&body.public_key, &bytes, &self.signature))
                .unwrap_or(false)
    }
}

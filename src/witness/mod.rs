// Witness module - INDEPENDENT OBSERVERS
// Witness nodes scan source-chain history and sign attestations for matching commitments

mod attestation;
mod codec;
mod node;
mod pool;
mod store;

pub use attestation::{Attestation, AttestationBody, AttestedValue};
pub use codec::{AttestationCodec, CodecError};
pub use node::{AttestationRequest, WitnessConfig, WitnessError, WitnessNode};
pub use pool::WitnessPool;
pub use store::{StoreError, WitnessStore};

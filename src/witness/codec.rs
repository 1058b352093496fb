use crate::witness::Attestation;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode attestation: {0}")]
    EncodeError(String),

    #[error("Failed to decode attestation: {0}")]
    DecodeError(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// Codec for moving attestations between witnesses and submitters
pub struct AttestationCodec;

impl AttestationCodec {
    /// Encode to compact binary (postcard)
    pub fn encode(attestation: &Attestation) -> Result<Vec<u8>, CodecError> {
        postcard::to_allocvec(attestation).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Attestation, CodecError> {
        postcard::from_bytes(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))
    }

    pub fn encode_hex(attestation: &Attestation) -> Result<String, CodecError> {
        Self::encode(attestation).map(hex::encode)
    }

    pub fn decode_hex(hex_str: &str) -> Result<Attestation, CodecError> {
        let bytes = hex::decode(hex_str).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// URL-safe base64 without padding
    pub fn encode_base64(attestation: &Attestation) -> Result<String, CodecError> {
        Self::encode(attestation).map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn decode_base64(b64_str: &str) -> Result<Attestation, CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str)
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}

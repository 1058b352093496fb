use crate::common::{attestation_for, commitment};
use xchain_bridge::witness::{AttestationCodec, CodecError};

/// Test: Binary encoding keeps the signature valid
#[test]
fn test_binary_encoding_preserves_signature() {
    let attestation = attestation_for(0, &commitment(1, 740));
    let bytes = AttestationCodec::encode(&attestation).unwrap();
    let decoded = AttestationCodec::decode(&bytes).unwrap();

    assert_eq!(decoded, attestation);
    assert!(decoded.verify());
}

/// Test: Hex and base64 encodings decode back
#[test]
fn test_text_encodings() {
    let attestation = attestation_for(1, &commitment(2, 5));

    let hex = AttestationCodec::encode_hex(&attestation).unwrap();
    assert_eq!(AttestationCodec::decode_hex(&hex).unwrap(), attestation);

    let b64 = AttestationCodec::encode_base64(&attestation).unwrap();
    assert!(!b64.contains('='));
    assert_eq!(AttestationCodec::decode_base64(&b64).unwrap(), attestation);
}

/// Test: Invalid input fails to decode
#[test]
fn test_invalid_input_rejected() {
    assert!(matches!(AttestationCodec::decode_hex("zz"), Err(CodecError::InvalidHex(_))));
    assert!(matches!(AttestationCodec::decode_base64("!!"), Err(CodecError::InvalidBase64(_))));
    assert!(matches!(AttestationCodec::decode(&[1, 2, 3]), Err(CodecError::DecodeError(_))));
}

/// Test: Tampered bytes fail verification
#[test]
fn test_tampered_bytes_fail_verification() {
    let attestation = attestation_for(0, &commitment(1, 740));
    let mut body = attestation.body().clone();
    body.value.amount = body.value.amount.with_value(741);
    let forged = xchain_bridge::witness::Attestation::from_parts(body, *attestation.signature());

    assert!(!forged.verify());
}

/// Test: Signing bytes are the domain prefix followed by the encoded body
#[test]
fn test_signing_bytes_are_prefixed_body() {
    let attestation = attestation_for(0, &commitment(1, 740));
    let bytes = attestation.body().to_signing_bytes().unwrap();
    let body = postcard::to_allocvec(attestation.body()).unwrap();

    assert!(bytes.starts_with(b"xchain-attestation:"));
    assert_eq!(&bytes[b"xchain-attestation:".len()..], body.as_slice());
    assert!(attestation.verify());
}

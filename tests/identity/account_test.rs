use xchain_bridge::identity::{AccountId, Keypair};

/// Test: Account ids render with the x prefix and parse back
#[test]
fn test_account_id_display_and_parse() {
    let id = AccountId::from_public_key(&Keypair::generate().public_key());
    let text = id.to_string();

    assert!(text.starts_with('x'));
    assert_eq!(AccountId::parse(&text).unwrap(), id);
}

/// Test: Account id is derived deterministically from the key
#[test]
fn test_account_id_is_deterministic() {
    let keypair = Keypair::from_seed("alice");
    let a = AccountId::from_public_key(&keypair.public_key());
    let b = AccountId::from_public_key(&Keypair::from_seed("alice").public_key());

    assert_eq!(a, b);
    assert_eq!(a.as_bytes().len(), 20);
}

/// Test: Malformed account strings are rejected
#[test]
fn test_parse_rejects_malformed() {
    assert!(AccountId::parse("").is_err());
    assert!(AccountId::parse("rabc").is_err());
    assert!(AccountId::parse("x0OIl").is_err());
    assert!(AccountId::parse("x1").is_err());
}

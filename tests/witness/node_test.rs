use crate::common::{account, reward_account, witness_keypair, Fixture};
use tempfile::TempDir;
use xchain_bridge::claims::ClaimRef;
use xchain_bridge::registry::{Amount, ChainSide};
use xchain_bridge::witness::{AttestationRequest, WitnessConfig, WitnessError, WitnessNode};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn persistent_witness(dir: &TempDir) -> WitnessNode {
    let config = WitnessConfig::new("persistent").with_db_path(dir.path().join("witness-db"));
    WitnessNode::new(config, witness_keypair(0), reward_account(0)).unwrap()
}

/// Fixture with one commitment of `amount` against a fresh ClaimID
fn committed(amount: i64) -> (Fixture, u64) {
    let mut fx = Fixture::new(3, 2);
    let id = fx.create_claim();
    fx.commit(id, amount, None);
    (fx, id)
}

// ============================================================================
// ATTESTATION
// ============================================================================

/// Test: A matching commitment is attested
#[test]
fn test_attest_matching_commitment() {
    let (fx, id) = committed(740);
    let node = &fx.pool.nodes()[0];

    let attestation = fx
        .network
        .attest(node, ChainSide::Locking, &fx.request(ClaimRef::Claim(id), 740))
        .unwrap();

    assert!(attestation.verify());
    assert_eq!(attestation.signer(), node.account());
    assert_eq!(attestation.reward_account(), &reward_account(0));
    assert_eq!(attestation.reference(), ClaimRef::Claim(id));
    assert_eq!(attestation.key().destination, ChainSide::Issuing);
    assert_eq!(attestation.value().amount, Amount::native(740));
    assert_eq!(attestation.value().sender, fx.alice);
    assert!(attestation.value().was_locking_chain_send);
}

/// Test: A wrong amount is not attested
#[test]
fn test_wrong_amount_is_not_attested() {
    let (fx, id) = committed(740);
    let node = &fx.pool.nodes()[0];

    let result = node.attest(
        fx.network.chain(ChainSide::Locking),
        &fx.request(ClaimRef::Claim(id), 741),
    );
    assert!(matches!(result, Err(WitnessError::NotFound(ClaimRef::Claim(_)))));
}

/// Test: A wrong sender is not attested
#[test]
fn test_wrong_sender_is_not_attested() {
    let (fx, id) = committed(740);
    let request = AttestationRequest::new(
        fx.bridge.clone(),
        ClaimRef::Claim(id),
        account("mallory"),
        Amount::native(740),
    );

    let result = fx.pool.nodes()[0].attest(fx.network.chain(ChainSide::Locking), &request);
    assert!(matches!(result, Err(WitnessError::NotFound(_))));
}

/// Test: No commitment, no attestation
#[test]
fn test_missing_commitment_is_not_attested() {
    let (fx, _) = committed(740);
    let result = fx.pool.nodes()[0].attest(
        fx.network.chain(ChainSide::Locking),
        &fx.request(ClaimRef::Claim(99), 740),
    );
    assert!(matches!(result, Err(WitnessError::NotFound(_))));
}

/// Test: The latest commitment on a ClaimID wins
#[test]
fn test_latest_commitment_wins() {
    let (mut fx, id) = committed(740);
    fx.commit(id, 900, None);
    let node = &fx.pool.nodes()[0];
    let chain = fx.network.chain(ChainSide::Locking);

    assert!(node.attest(chain, &fx.request(ClaimRef::Claim(id), 740)).is_err());
    let attestation = node.attest(chain, &fx.request(ClaimRef::Claim(id), 900)).unwrap();
    assert_eq!(attestation.value().amount.value(), 900);
}

/// Test: Witnesses can attest from a history snapshot
#[test]
fn test_attest_from_history_snapshot() {
    let (fx, id) = committed(740);
    let history = fx.network.history(ChainSide::Locking);

    let attestation = fx.pool.nodes()[1]
        .attest(history.as_ref(), &fx.request(ClaimRef::Claim(id), 740))
        .unwrap();
    assert_eq!(attestation.signer(), fx.pool.nodes()[1].account());
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Test: A stopped witness refuses to attest
#[test]
fn test_stopped_witness_refuses() {
    let (fx, id) = committed(740);
    let node = &fx.pool.nodes()[0];
    node.stop();

    assert!(!node.is_running());
    let request = fx.request(ClaimRef::Claim(id), 740);
    let result = node.attest(fx.network.chain(ChainSide::Locking), &request);
    assert!(matches!(result, Err(WitnessError::Stopped)));

    node.start().unwrap();
    assert!(node.attest(fx.network.chain(ChainSide::Locking), &request).is_ok());
}

/// Test: Issued attestations are logged to the database
#[test]
fn test_attestations_are_logged() {
    let dir = TempDir::new().unwrap();
    let (fx, id) = committed(740);
    let node = persistent_witness(&dir);

    node.attest(fx.network.chain(ChainSide::Locking), &fx.request(ClaimRef::Claim(id), 740))
        .unwrap();

    assert_eq!(node.logged_attestations(), 1);
    node.stop();

    node.start().unwrap();
    assert_eq!(node.logged_attestations(), 1, "log survives a restart");
}

/// Test: A restarted witness with no database still attests
#[test]
fn test_restart_with_deleted_database_still_attests() {
    let dir = TempDir::new().unwrap();
    let (fx, id) = committed(740);
    let node = persistent_witness(&dir);
    let request = fx.request(ClaimRef::Claim(id), 740);

    let before = node.attest(fx.network.chain(ChainSide::Locking), &request).unwrap();

    node.delete_database().unwrap();
    assert!(!node.is_running());
    assert!(!dir.path().join("witness-db").exists());

    node.start().unwrap();
    assert_eq!(node.logged_attestations(), 0);

    let after = node.attest(fx.network.chain(ChainSide::Locking), &request).unwrap();
    assert_eq!(before, after, "attestations depend only on chain history");
}

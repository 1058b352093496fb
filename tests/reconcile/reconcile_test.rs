use crate::common::{account, attestation_for, commitment, reward_account, Fixture, BASE_FEE, REWARD};
use xchain_bridge::claims::ClaimRef;
use xchain_bridge::reconcile::{BridgeEvent, ReconcileError};
use xchain_bridge::registry::{Asset, ChainSide, SignerList};
use xchain_bridge::settlement::{RemainderPolicy, SettlementConfig};
use xchain_bridge::NetworkConfig;

const CREATE: i64 = 20_000_000;

/// Test: A settled claim moves exactly the derived balances
#[test]
fn test_claim_flow_reconciles() {
    let mut fx = Fixture::new(5, 4);
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    let id = fx.create_claim();
    fx.commit(id, 740, None);
    fx.attest(&[0, 1, 2, 3, 4], ClaimRef::Claim(id), 740);
    fx.network
        .claim(ChainSide::Issuing, &fx.claim_request(id, 740))
        .unwrap();

    let expected = fx.network.expected_since(mark);
    let after = fx.network.snapshot();
    expected.verify(&before, &after).unwrap();
    assert_eq!(expected.expected_after(&before), after);

    assert_eq!(expected.native_delta(ChainSide::Locking, &fx.alice), -740 - BASE_FEE);
    assert_eq!(expected.native_delta(ChainSide::Locking, &fx.locking_door), 740);
    assert_eq!(
        expected.native_delta(ChainSide::Issuing, &fx.bob),
        740 - REWARD - BASE_FEE - 5 * BASE_FEE - BASE_FEE
    );
    assert_eq!(expected.native_delta(ChainSide::Issuing, &reward_account(2)), 20);
}

/// Test: Forfeited principal stays with the door, rewards are still paid
#[test]
fn test_forfeiture_reconciles() {
    let mut fx = Fixture::new(5, 4);
    let erin = account("erin");
    fx.network.chain_mut(ChainSide::Issuing).fund(erin, 5_000).unwrap();
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    fx.network.set_deposit_auth(ChainSide::Issuing, erin, true).unwrap();
    let seq = fx.commit_account_create(erin, CREATE);
    fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(seq), CREATE);

    let expected = fx.network.expected_since(mark);
    expected.verify(&before, &fx.network.snapshot()).unwrap();
    assert_eq!(expected.native_delta(ChainSide::Issuing, &erin), -BASE_FEE);
    assert_eq!(expected.native_delta(ChainSide::Issuing, &fx.issuing_door), -REWARD);
    assert_eq!(expected.native_delta(ChainSide::Locking, &fx.locking_door), CREATE + REWARD);
}

/// Test: Rounding remainders follow the configured policy
#[test]
fn test_remainder_reconciles() {
    let treasury = account("treasury");
    let config = NetworkConfig::new()
        .with_settlement(SettlementConfig::new().with_remainder(RemainderPolicy::Account(treasury)));
    let mut fx = Fixture::with_config(5, 3, config);
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    let seq = fx.commit_account_create(account("carol"), CREATE);
    fx.attest(&[0, 1, 2], ClaimRef::CreateSequence(seq), CREATE);

    let expected = fx.network.expected_since(mark);
    expected.verify(&before, &fx.network.snapshot()).unwrap();
    assert_eq!(expected.native_delta(ChainSide::Issuing, &treasury), 1);
    assert_eq!(expected.native_delta(ChainSide::Issuing, &reward_account(0)), 33);
}

/// Test: Reward recipients follow the signer list in force at settlement
#[test]
fn test_signer_list_change_reconciles() {
    let mut fx = Fixture::new(5, 3);
    let bridge = fx.bridge.clone();
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    let id = fx.create_claim();
    fx.commit(id, 740, None);
    fx.attest(&[4], ClaimRef::Claim(id), 740);

    let accounts = fx.pool.accounts();
    fx.network
        .set_signer_list(&bridge, SignerList::uniform(&accounts[..4], 3).unwrap())
        .unwrap();
    fx.attest(&[0, 1, 2], ClaimRef::Claim(id), 740);
    fx.network
        .claim(ChainSide::Issuing, &fx.claim_request(id, 740))
        .unwrap();

    let expected = fx.network.expected_since(mark);
    expected.verify(&before, &fx.network.snapshot()).unwrap();
    assert_eq!(expected.native_delta(ChainSide::Issuing, &reward_account(4)), 0);
    assert_eq!(expected.native_delta(ChainSide::Issuing, &reward_account(0)), 33);
}

/// Test: Dissenting votes are replayed but earn nothing
#[test]
fn test_dissent_reconciles() {
    let mut fx = Fixture::new(5, 3);
    let bob = fx.bob;
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    let id = fx.create_claim();
    fx.commit(id, 740, None);
    fx.network
        .submit_attestation(&attestation_for(4, &commitment(id, 741)), bob)
        .unwrap();
    fx.attest(&[0, 1, 2, 3], ClaimRef::Claim(id), 740);
    fx.network
        .claim(ChainSide::Issuing, &fx.claim_request(id, 740))
        .unwrap();

    let expected = fx.network.expected_since(mark);
    expected.verify(&before, &fx.network.snapshot()).unwrap();
    assert_eq!(expected.native_delta(ChainSide::Issuing, &reward_account(4)), 0);
    assert_eq!(expected.native_delta(ChainSide::Issuing, &reward_account(0)), 25);
}

/// Test: Failed operations leave both chains and the log untouched
#[test]
fn test_failures_move_nothing() {
    let mut fx = Fixture::new(5, 4);
    let id = fx.create_claim();
    fx.commit(id, 740, None);
    fx.attest(&[0, 1, 2, 3], ClaimRef::Claim(id), 740);
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    assert!(fx
        .network
        .claim(ChainSide::Issuing, &fx.claim_request(id, 741))
        .is_err());
    assert!(fx
        .network
        .claim(ChainSide::Issuing, &fx.claim_request(id + 1, 740))
        .is_err());

    assert_eq!(fx.network.mark(), mark);
    assert_eq!(fx.network.snapshot(), before);
}

/// Test: A balance change outside the bridge is reported
#[test]
fn test_unlogged_movement_detected() {
    let mut fx = Fixture::new(3, 2);
    let before = fx.network.snapshot();
    let mark = fx.network.mark();

    fx.create_claim();
    let mallory = account("mallory");
    fx.network.chain_mut(ChainSide::Issuing).fund(mallory, 42).unwrap();

    let err = fx
        .network
        .expected_since(mark)
        .verify(&before, &fx.network.snapshot())
        .unwrap_err();
    let ReconcileError::Mismatch { chain, expected, actual, .. } = err;
    assert_eq!(chain, ChainSide::Issuing);
    assert_ne!(expected, actual);
}

/// Test: The full log replays registration before any balance moves
#[test]
fn test_log_starts_with_registration() {
    let fx = Fixture::new(3, 2);
    let events = fx.network.events().events();

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], BridgeEvent::BridgeRegistered { bridge, .. } if *bridge == fx.bridge));
    assert!(fx
        .network
        .expected_balances()
        .delta(ChainSide::Issuing, &fx.bob, &Asset::Native)
        == 0);
}

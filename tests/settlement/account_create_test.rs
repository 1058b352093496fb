use crate::common::{account, reward_account, Fixture, BASE_FEE, FUNDING, MIN_CREATE, REWARD};
use xchain_bridge::claims::{ClaimError, ClaimRef};
use xchain_bridge::quorum::QuorumStatus;
use xchain_bridge::registry::{Amount, BridgeModification, ChainSide};
use xchain_bridge::settlement::SettlementOutcome;
use xchain_bridge::{BridgeError, ErrorClass};

const AMOUNT: i64 = 20_000_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn settled(outcome: &Option<SettlementOutcome>) -> bool {
    matches!(outcome, Some(SettlementOutcome::Settled(_)))
}

// ============================================================================
// COMMITS
// ============================================================================

/// Test: Commits take sequences 1 and 2 and fund the door
#[test]
fn test_commit_assigns_sequences() {
    let mut fx = Fixture::new(5, 4);
    let first = fx.commit_account_create(account("carol"), AMOUNT);
    let second = fx.commit_account_create(account("dave"), AMOUNT);

    assert_eq!((first, second), (1, 2));
    assert_eq!(fx.network.claims().account_create_count(&fx.bridge, ChainSide::Locking), 2);
    assert_eq!(
        fx.balance(ChainSide::Locking, &fx.alice),
        FUNDING - 2 * (AMOUNT + REWARD + BASE_FEE)
    );
    assert_eq!(
        fx.balance(ChainSide::Locking, &fx.locking_door),
        FUNDING + 2 * (AMOUNT + REWARD)
    );
}

/// Test: A commit below the minimum is refused
#[test]
fn test_commit_below_minimum() {
    let mut fx = Fixture::new(5, 4);
    let bridge = fx.bridge.clone();
    let reward = fx.reward();

    let err = fx
        .network
        .commit_account_create(
            &bridge,
            ChainSide::Locking,
            fx.alice,
            account("carol"),
            &Amount::native(MIN_CREATE - 1),
            &reward,
        )
        .unwrap_err();

    assert!(matches!(err, BridgeError::Claim(ClaimError::BelowMinimum { .. })));
    assert_eq!(err.class(), ErrorClass::Policy);
    assert_eq!(fx.balance(ChainSide::Locking, &fx.alice), FUNDING);
}

/// Test: A commit is refused once account-create is disabled
#[test]
fn test_commit_when_disabled() {
    let mut fx = Fixture::new(5, 4);
    let bridge = fx.bridge.clone();
    let reward = fx.reward();
    fx.network
        .modify_bridge(&bridge, BridgeModification::new().with_clear_account_create())
        .unwrap();

    let err = fx
        .network
        .commit_account_create(
            &bridge,
            ChainSide::Locking,
            fx.alice,
            account("carol"),
            &Amount::native(AMOUNT),
            &reward,
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::Claim(ClaimError::AccountCreateDisabled)));
}

/// Test: A commit with the wrong reward is refused
#[test]
fn test_commit_with_wrong_reward() {
    let mut fx = Fixture::new(5, 4);
    let bridge = fx.bridge.clone();

    let err = fx
        .network
        .commit_account_create(
            &bridge,
            ChainSide::Locking,
            fx.alice,
            account("carol"),
            &Amount::native(AMOUNT),
            &Amount::native(REWARD + 1),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::Claim(ClaimError::RewardMismatch { .. })));
}

// ============================================================================
// AUTOMATIC SETTLEMENT
// ============================================================================

/// Test: Quorum creates and funds the destination account
#[test]
fn test_quorum_creates_account() {
    let mut fx = Fixture::new(5, 4);
    let carol = account("carol");
    let seq = fx.commit_account_create(carol, AMOUNT);
    let door_before = fx.balance(ChainSide::Issuing, &fx.issuing_door);

    let outcomes = fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(seq), AMOUNT);

    assert!(outcomes[..3].iter().all(|o| o.settlement.is_none()));
    assert!(settled(&outcomes[3].settlement));
    assert_eq!(outcomes[3].state.status, QuorumStatus::Settled);
    assert!(fx.network.chain(ChainSide::Issuing).account(&carol).is_some());
    assert_eq!(fx.balance(ChainSide::Issuing, &carol), AMOUNT);
    assert_eq!(
        fx.balance(ChainSide::Issuing, &fx.issuing_door),
        door_before - AMOUNT - REWARD
    );
    for witness in 0..4 {
        assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(witness)), REWARD / 4);
    }
    assert_eq!(fx.network.claims().account_claim_count(&fx.bridge, ChainSide::Issuing), 1);
}

/// Test: An existing destination is credited
#[test]
fn test_existing_destination_is_credited() {
    let mut fx = Fixture::new(3, 2);
    let carol = account("carol");
    fx.network.chain_mut(ChainSide::Issuing).fund(carol, 1_000).unwrap();
    let seq = fx.commit_account_create(carol, AMOUNT);

    let outcomes = fx.attest(&[0, 1], ClaimRef::CreateSequence(seq), AMOUNT);

    assert!(settled(&outcomes[1].settlement));
    assert_eq!(fx.balance(ChainSide::Issuing, &carol), 1_000 + AMOUNT);
}

/// Test: A resolved sequence refuses late attestations
#[test]
fn test_resolved_sequence_refuses_attestations() {
    let mut fx = Fixture::new(5, 4);
    let seq = fx.commit_account_create(account("carol"), AMOUNT);
    fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(seq), AMOUNT);

    let node = &fx.pool.nodes()[4];
    let attestation = fx
        .network
        .attest(node, ChainSide::Locking, &fx.request(ClaimRef::CreateSequence(seq), AMOUNT))
        .unwrap();
    let err = fx.network.submit_attestation(&attestation, fx.bob).unwrap_err();

    assert_eq!(err.class(), ErrorClass::Fatal);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(4)), 0);
}

/// Test: A resolved sequence stays closed after the evaluator is pruned
#[test]
fn test_resolved_sequence_refused_after_prune() {
    let mut fx = Fixture::new(5, 4);
    let seq = fx.commit_account_create(account("carol"), AMOUNT);
    fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(seq), AMOUNT);

    assert_eq!(fx.network.prune_resolved(), 1);
    assert_eq!(fx.network.evaluator().tracked(), 0);

    let node = &fx.pool.nodes()[4];
    let attestation = fx
        .network
        .attest(node, ChainSide::Locking, &fx.request(ClaimRef::CreateSequence(seq), AMOUNT))
        .unwrap();
    let err = fx.network.submit_attestation(&attestation, fx.bob).unwrap_err();

    assert!(matches!(err, BridgeError::Claim(ClaimError::NoClaimId { retired: true, .. })));
    assert_eq!(err.class(), ErrorClass::Fatal);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(4)), 0);
}

// ============================================================================
// ORDERING
// ============================================================================

/// Test: A later sequence waits for the earlier one
#[test]
fn test_later_sequence_is_held() {
    let mut fx = Fixture::new(5, 4);
    let carol = account("carol");
    let dave = account("dave");
    fx.commit_account_create(carol, AMOUNT);
    fx.commit_account_create(dave, AMOUNT);

    let outcomes = fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(2), AMOUNT);
    assert!(matches!(
        outcomes[3].settlement,
        Some(SettlementOutcome::Held { sequence: 2, next: 1 })
    ));
    assert!(outcomes[3].state.has_quorum());
    assert!(fx.network.chain(ChainSide::Issuing).account(&dave).is_none());

    let outcomes = fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(1), AMOUNT);
    assert!(settled(&outcomes[3].settlement));
    assert_eq!(fx.balance(ChainSide::Issuing, &carol), AMOUNT);

    // the held sequence waits for another trigger
    assert!(fx.network.chain(ChainSide::Issuing).account(&dave).is_none());
    let outcomes = fx.attest(&[4], ClaimRef::CreateSequence(2), AMOUNT);
    assert!(settled(&outcomes[0].settlement));
    assert_eq!(fx.balance(ChainSide::Issuing, &dave), AMOUNT);

    // five contributors on the second sequence
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(0)), 25 + 20);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(4)), 20);
}

/// Test: A held sequence settles when retried
#[test]
fn test_held_sequence_settles_on_retry() {
    let mut fx = Fixture::new(5, 4);
    let bridge = fx.bridge.clone();
    let dave = account("dave");
    fx.commit_account_create(account("carol"), AMOUNT);
    fx.commit_account_create(dave, AMOUNT);
    fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(2), AMOUNT);

    let early = fx.network.auto_settle(&bridge, ChainSide::Issuing, 2).unwrap();
    assert!(matches!(early, SettlementOutcome::Held { .. }));

    fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(1), AMOUNT);
    let outcome = fx.network.auto_settle(&bridge, ChainSide::Issuing, 2).unwrap();
    assert!(matches!(outcome, SettlementOutcome::Settled(_)));
    assert_eq!(fx.balance(ChainSide::Issuing, &dave), AMOUNT);
    assert_eq!(fx.network.claims().next_sequence(&bridge, ChainSide::Issuing), 3);
}

/// Test: Without quorum a sequence stays pending
#[test]
fn test_pending_sequence_without_quorum() {
    let mut fx = Fixture::new(5, 4);
    let bridge = fx.bridge.clone();
    fx.commit_account_create(account("carol"), AMOUNT);
    fx.attest(&[0, 1], ClaimRef::CreateSequence(1), AMOUNT);

    let outcome = fx.network.auto_settle(&bridge, ChainSide::Issuing, 1).unwrap();
    match outcome {
        SettlementOutcome::Pending(state) => {
            assert_eq!(state.status, QuorumStatus::PartiallyAttested);
            assert_eq!(state.leading_weight, 2);
        }
        other => panic!("expected pending, got {:?}", other),
    }
}

// ============================================================================
// FORFEITURE
// ============================================================================

/// Test: A deposit-auth destination forfeits the principal
#[test]
fn test_deposit_auth_destination_forfeits() {
    let mut fx = Fixture::new(5, 4);
    let erin = account("erin");
    fx.network.chain_mut(ChainSide::Issuing).fund(erin, FUNDING).unwrap();
    fx.network.set_deposit_auth(ChainSide::Issuing, erin, true).unwrap();
    let seq = fx.commit_account_create(erin, AMOUNT);
    let door_before = fx.balance(ChainSide::Issuing, &fx.issuing_door);

    let outcomes = fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(seq), AMOUNT);

    match &outcomes[3].settlement {
        Some(SettlementOutcome::Forfeited(settlement)) => assert!(!settlement.delivered),
        other => panic!("expected forfeiture, got {:?}", other),
    }
    assert_eq!(outcomes[3].state.status, QuorumStatus::Destroyed);
    assert_eq!(fx.balance(ChainSide::Issuing, &erin), FUNDING - BASE_FEE);
    assert_eq!(fx.balance(ChainSide::Issuing, &fx.issuing_door), door_before - REWARD);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(0)), REWARD / 4);
    assert_eq!(fx.network.claims().next_sequence(&fx.bridge, ChainSide::Issuing), 2);
}

/// Test: Preauthorizing the door avoids forfeiture
#[test]
fn test_preauthorized_door_avoids_forfeiture() {
    let mut fx = Fixture::new(5, 4);
    let erin = account("erin");
    let door = fx.issuing_door;
    fx.network.chain_mut(ChainSide::Issuing).fund(erin, FUNDING).unwrap();
    fx.network.set_deposit_auth(ChainSide::Issuing, erin, true).unwrap();
    fx.network.preauthorize(ChainSide::Issuing, erin, door).unwrap();
    let seq = fx.commit_account_create(erin, AMOUNT);

    let outcomes = fx.attest(&[0, 1, 2, 3], ClaimRef::CreateSequence(seq), AMOUNT);

    assert!(settled(&outcomes[3].settlement));
    assert_eq!(fx.balance(ChainSide::Issuing, &erin), FUNDING - 2 * BASE_FEE + AMOUNT);
}

// ============================================================================
// REWARD CHANGES
// ============================================================================

/// Test: An in-flight sequence attested at the old reward is refused after a change
#[test]
fn test_reward_change_refuses_stale_sequence() {
    let mut fx = Fixture::new(5, 2);
    let bridge = fx.bridge.clone();
    let carol = account("carol");
    let seq = fx.commit_account_create(carol, MIN_CREATE);
    fx.network
        .modify_bridge(
            &bridge,
            BridgeModification::new().with_signature_reward(Amount::native(2 * REWARD)),
        )
        .unwrap();
    let bob_before = fx.balance(ChainSide::Issuing, &fx.bob);

    for i in 0..2 {
        let node = &fx.pool.nodes()[i];
        let attestation = fx
            .network
            .attest(node, ChainSide::Locking, &fx.request(ClaimRef::CreateSequence(seq), MIN_CREATE))
            .unwrap();
        let err = fx.network.submit_attestation(&attestation, fx.bob).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Claim(ClaimError::RewardMismatch { ref expected, .. })
                if expected.value() == 2 * REWARD
        ));
        assert_eq!(err.class(), ErrorClass::Policy);
    }

    let key = fx.claim_key(ClaimRef::CreateSequence(seq));
    assert_eq!(fx.network.quorum_state(&key).unwrap().status, QuorumStatus::Empty);
    assert!(fx.network.chain(ChainSide::Issuing).account(&carol).is_none());
    assert_eq!(fx.balance(ChainSide::Issuing, &fx.bob), bob_before);
    assert_eq!(fx.network.claims().next_sequence(&bridge, ChainSide::Issuing), seq);
}

/// Test: Restoring the reward lets the stale sequence settle at that reward
#[test]
fn test_restored_reward_unblocks_sequence() {
    let mut fx = Fixture::new(5, 2);
    let bridge = fx.bridge.clone();
    let carol = account("carol");
    let seq = fx.commit_account_create(carol, MIN_CREATE);
    fx.network
        .modify_bridge(
            &bridge,
            BridgeModification::new().with_signature_reward(Amount::native(2 * REWARD)),
        )
        .unwrap();
    let reward = fx.reward();
    fx.network
        .modify_bridge(&bridge, BridgeModification::new().with_signature_reward(reward))
        .unwrap();

    let outcomes = fx.attest(&[0, 1], ClaimRef::CreateSequence(seq), MIN_CREATE);

    assert!(settled(&outcomes[1].settlement));
    assert_eq!(fx.balance(ChainSide::Issuing, &carol), MIN_CREATE);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(0)), REWARD / 2);
}

/// Test: A sequence committed after a reward change settles and pays the new reward
#[test]
fn test_new_sequence_uses_current_reward() {
    let mut fx = Fixture::new(5, 2);
    let bridge = fx.bridge.clone();
    let carol = account("carol");
    let new_reward = Amount::native(2 * REWARD);
    fx.network
        .modify_bridge(&bridge, BridgeModification::new().with_signature_reward(new_reward.clone()))
        .unwrap();
    let door_before = fx.balance(ChainSide::Issuing, &fx.issuing_door);

    let commitment = fx
        .network
        .commit_account_create(
            &bridge,
            ChainSide::Locking,
            fx.alice,
            carol,
            &Amount::native(MIN_CREATE),
            &new_reward,
        )
        .unwrap();
    let outcomes = fx.attest(&[0, 1], commitment.reference, MIN_CREATE);

    assert!(settled(&outcomes[1].settlement));
    assert_eq!(fx.balance(ChainSide::Issuing, &carol), MIN_CREATE);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(0)), REWARD);
    assert_eq!(fx.balance(ChainSide::Issuing, &reward_account(1)), REWARD);
    assert_eq!(
        fx.balance(ChainSide::Issuing, &fx.issuing_door),
        door_before - MIN_CREATE - 2 * REWARD
    );
}

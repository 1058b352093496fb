use crate::common::Fixture;
use xchain_bridge::claims::ClaimRef;
use xchain_bridge::registry::ChainSide;
use xchain_bridge::witness::WitnessError;

/// Test: Pool results come back in witness order
#[tokio::test]
async fn test_attest_all_in_pool_order() {
    let mut fx = Fixture::new(5, 4);
    let id = fx.create_claim();
    fx.commit(id, 740, None);

    let results = fx
        .pool
        .attest_all(fx.network.history(ChainSide::Locking), fx.request(ClaimRef::Claim(id), 740))
        .await;

    assert_eq!(results.len(), 5);
    let signers: Vec<_> = results.iter().map(|(signer, _)| *signer).collect();
    assert_eq!(signers, fx.pool.accounts());
    assert!(results.iter().all(|(_, r)| r.is_ok()));
}

/// Test: The pool reports stopped witnesses
#[tokio::test]
async fn test_attest_all_reports_stopped_witnesses() {
    let mut fx = Fixture::new(5, 4);
    let id = fx.create_claim();
    fx.commit(id, 740, None);
    fx.pool.nodes()[1].stop();
    fx.pool.nodes()[3].stop();

    let results = fx
        .pool
        .attest_all(fx.network.history(ChainSide::Locking), fx.request(ClaimRef::Claim(id), 740))
        .await;

    let stopped = results
        .iter()
        .filter(|(_, r)| matches!(r, Err(WitnessError::Stopped)))
        .count();
    assert_eq!(stopped, 2);
    assert!(results[0].1.is_ok());
}

/// Test: Pool attestations reach quorum
#[tokio::test]
async fn test_pool_attestations_reach_quorum() {
    let mut fx = Fixture::new(5, 4);
    let id = fx.create_claim();
    fx.commit(id, 740, None);

    let results = fx
        .pool
        .attest_all(fx.network.history(ChainSide::Locking), fx.request(ClaimRef::Claim(id), 740))
        .await;
    let bob = fx.bob;
    let mut last = None;
    for (_, result) in results {
        last = Some(fx.network.submit_attestation(&result.unwrap(), bob).unwrap());
    }

    let state = last.unwrap().state;
    assert!(state.has_quorum());
    assert_eq!(state.leading_weight, 5);
}

/// Test: Sequential attestation skips stopped witnesses and stops at the limit
#[test]
fn test_attest_sequential_limit() {
    let mut fx = Fixture::new(5, 4);
    let id = fx.create_claim();
    fx.commit(id, 740, None);
    fx.pool.nodes()[0].stop();

    let history = fx.network.history(ChainSide::Locking);
    let attestations =
        fx.pool
            .attest_sequential(history.as_ref(), &fx.request(ClaimRef::Claim(id), 740), 3);

    assert_eq!(attestations.len(), 3);
    assert_eq!(attestations[0].signer(), fx.pool.nodes()[1].account());
    assert!(fx.pool.by_account(attestations[2].signer()).is_some());
}

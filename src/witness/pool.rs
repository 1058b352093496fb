// Witness Pool - runs every witness as an independent task

use crate::identity::AccountId;
use crate::ledger::ChainHistory;
use crate::witness::{Attestation, AttestationRequest, WitnessError, WitnessNode};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// The set of witnesses serving a bridge
#[derive(Default)]
pub struct WitnessPool {
    nodes: Vec<Arc<WitnessNode>>,
}

impl WitnessPool {
    pub fn new(nodes: Vec<WitnessNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Arc<WitnessNode>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Arc<WitnessNode>> {
        self.nodes.get(index)
    }

    /// Find a witness by signer account
    pub fn by_account(&self, account: &AccountId) -> Option<&Arc<WitnessNode>> {
        self.nodes.iter().find(|n| n.account() == account)
    }

    /// Signer accounts, in pool order
    pub fn accounts(&self) -> Vec<AccountId> {
        self.nodes.iter().map(|n| *n.account()).collect()
    }

    /// Ask every witness concurrently; results come back in pool order.
    ///
    /// Witnesses share nothing but the immutable history snapshot.
    pub async fn attest_all(
        &self,
        history: Arc<ChainHistory>,
        request: AttestationRequest,
    ) -> Vec<(AccountId, Result<Attestation, WitnessError>)> {
        let mut tasks = JoinSet::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let node = Arc::clone(node);
            let history = Arc::clone(&history);
            let request = request.clone();
            tasks.spawn(async move {
                let result = node.attest(history.as_ref(), &request);
                (index, *node.account(), result)
            });
        }

        let mut results = Vec::with_capacity(self.nodes.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "witness task failed"),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, account, result)| (account, result))
            .collect()
    }

    /// Attest with every witness in turn, stopping at the first `limit` successes
    pub fn attest_sequential(
        &self,
        history: &ChainHistory,
        request: &AttestationRequest,
        limit: usize,
    ) -> Vec<Attestation> {
        self.nodes
            .iter()
            .filter_map(|node| node.attest(history, request).ok())
            .take(limit)
            .collect()
    }
}

// Quorum Evaluator - per-reference attestation aggregation

use crate::claims::ClaimKey;
use crate::error::ErrorClass;
use crate::identity::AccountId;
use crate::quorum::{tally, QuorumSet, Tally, Vote};
use crate::registry::SignerList;
use crate::witness::{Attestation, AttestedValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from submitting an attestation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuorumError {
    #[error("Signer {0} is not on the bridge's signer list")]
    NoPermission(AccountId),

    #[error("Attestation signature is invalid")]
    BadSignature,

    #[error("Signer {0} already attested a different value")]
    ConflictingAttestation(AccountId),

    #[error("Reference {key} is already {status:?}")]
    Retired { key: String, status: QuorumStatus },
}

impl QuorumError {
    pub fn class(&self) -> ErrorClass {
        match self {
            QuorumError::NoPermission(_) => ErrorClass::Permission,
            QuorumError::BadSignature => ErrorClass::Malformed,
            QuorumError::ConflictingAttestation(_) => ErrorClass::Policy,
            QuorumError::Retired { .. } => ErrorClass::Fatal,
        }
    }
}

/// What a signer re-attesting a different value does
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReattestPolicy {
    /// The signer's latest attestation replaces the earlier one
    #[default]
    Replace,
    /// A different value from the same signer is refused
    Reject,
}

/// Lifecycle of one claim reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuorumStatus {
    Empty,
    PartiallyAttested,
    QuorumReached,
    Settled,
    Destroyed,
}

impl QuorumStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, QuorumStatus::Settled | QuorumStatus::Destroyed)
    }
}

/// Snapshot of a reference after an attestation was applied
#[derive(Clone, Debug)]
pub struct QuorumState {
    pub key: ClaimKey,
    pub status: QuorumStatus,
    pub cumulative_weight: u32,
    pub leading_weight: u32,
    pub threshold: u32,
    pub leading_value: Option<AttestedValue>,
    pub signer_list_version: u64,
}

impl QuorumState {
    pub fn has_quorum(&self) -> bool {
        self.status == QuorumStatus::QuorumReached
    }
}

#[derive(Debug)]
struct ReferenceState {
    votes: BTreeMap<AccountId, Vote>,
    terminal: Option<QuorumStatus>,
}

impl ReferenceState {
    fn new() -> Self {
        Self {
            votes: BTreeMap::new(),
            terminal: None,
        }
    }

    fn snapshot(&self, key: &ClaimKey, signers: &SignerList) -> QuorumState {
        let counted = tally(self.votes.values(), signers);
        let leading = counted.leading();
        let leading_weight = leading.map(|g| g.weight).unwrap_or(0);

        let status = match self.terminal {
            Some(terminal) => terminal,
            None if counted.cumulative_weight == 0 => QuorumStatus::Empty,
            None if leading_weight >= signers.quorum() => QuorumStatus::QuorumReached,
            None => QuorumStatus::PartiallyAttested,
        };

        QuorumState {
            key: key.clone(),
            status,
            cumulative_weight: counted.cumulative_weight,
            leading_weight,
            threshold: signers.quorum(),
            leading_value: leading.map(|g| g.value.clone()),
            signer_list_version: signers.version(),
        }
    }
}

/// Attestation aggregator.
///
/// Updates to one reference serialize on that reference's lock; different
/// references proceed in parallel. The signer list is passed in on every
/// call so that list changes take effect immediately.
#[derive(Debug, Default)]
pub struct QuorumEvaluator {
    policy: ReattestPolicy,
    references: RwLock<HashMap<ClaimKey, Arc<Mutex<ReferenceState>>>>,
}

impl QuorumEvaluator {
    pub fn new(policy: ReattestPolicy) -> Self {
        Self {
            policy,
            references: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> ReattestPolicy {
        self.policy
    }

    /// Apply one attestation and report the reference's new state
    pub fn submit(
        &self,
        attestation: &Attestation,
        signers: &SignerList,
    ) -> Result<QuorumState, QuorumError> {
        if !attestation.verify() {
            warn!(claim = %attestation.key(), signer = %attestation.signer(), "bad attestation signature");
            return Err(QuorumError::BadSignature);
        }
        let signer = *attestation.signer();
        if !signers.contains(&signer) {
            warn!(claim = %attestation.key(), %signer, version = signers.version(), "attestation from unlisted signer");
            return Err(QuorumError::NoPermission(signer));
        }

        let key = attestation.key();
        let shard = self.shard(key);
        let mut state = lock(&shard);

        if let Some(status) = state.terminal {
            return Err(QuorumError::Retired {
                key: key.to_string(),
                status,
            });
        }

        let vote = Vote {
            signer,
            reward_account: *attestation.reward_account(),
            value: attestation.value().clone(),
        };
        if let Some(previous) = state.votes.get(&signer) {
            if previous.value != vote.value && self.policy == ReattestPolicy::Reject {
                return Err(QuorumError::ConflictingAttestation(signer));
            }
        }
        state.votes.insert(signer, vote);

        let snapshot = state.snapshot(key, signers);
        match snapshot.status {
            QuorumStatus::QuorumReached => info!(
                claim = %key,
                weight = snapshot.leading_weight,
                threshold = snapshot.threshold,
                "quorum reached"
            ),
            _ => debug!(
                claim = %key,
                %signer,
                weight = snapshot.leading_weight,
                threshold = snapshot.threshold,
                "attestation accepted"
            ),
        }
        Ok(snapshot)
    }

    /// Current state of a reference under `signers`
    pub fn state(&self, key: &ClaimKey, signers: &SignerList) -> QuorumState {
        let Some(shard) = self.existing_shard(key) else {
            return ReferenceState::new().snapshot(key, signers);
        };
        let state = lock(&shard);
        state.snapshot(key, signers)
    }

    /// Full tally of a reference's votes
    pub fn tally(&self, key: &ClaimKey, signers: &SignerList) -> Tally {
        let Some(shard) = self.existing_shard(key) else {
            return Tally::default();
        };
        let state = lock(&shard);
        tally(state.votes.values(), signers)
    }

    /// Best-supported value accepted by `accept` that has reached quorum
    pub fn quorum_where<F>(&self, key: &ClaimKey, signers: &SignerList, accept: F) -> Option<QuorumSet>
    where
        F: Fn(&AttestedValue) -> bool,
    {
        self.tally(key, signers)
            .quorum_where(signers.quorum(), accept)
            .cloned()
    }

    /// Close a reference; later attestations for it are refused.
    ///
    /// The closed entry keeps no votes, only its final status, until
    /// `prune_finished` drops it.
    pub fn finish(&self, key: &ClaimKey, status: QuorumStatus) {
        let shard = self.shard(key);
        let mut state = lock(&shard);
        state.votes.clear();
        state.terminal = Some(status);
        debug!(claim = %key, ?status, "reference closed");
    }

    /// Drop every closed reference and return how many were dropped.
    ///
    /// A pruned reference reads as `Empty` again, so callers must refuse
    /// resolved references themselves (the claim ledger's retired ids and
    /// sequence counters do).
    pub fn prune_finished(&self) -> usize {
        let mut refs = self
            .references
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = refs.len();
        refs.retain(|_, shard| lock(shard).terminal.is_none());
        let pruned = before - refs.len();
        debug!(pruned, live = refs.len(), "closed references pruned");
        pruned
    }

    /// Number of references with live or closed state
    pub fn tracked(&self) -> usize {
        self.references
            .read()
            .map(|refs| refs.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    fn existing_shard(&self, key: &ClaimKey) -> Option<Arc<Mutex<ReferenceState>>> {
        let refs = self
            .references
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        refs.get(key).cloned()
    }

    fn shard(&self, key: &ClaimKey) -> Arc<Mutex<ReferenceState>> {
        if let Some(shard) = self.existing_shard(key) {
            return shard;
        }
        let mut refs = self
            .references
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            refs.entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(ReferenceState::new()))),
        )
    }
}

fn lock(shard: &Mutex<ReferenceState>) -> MutexGuard<'_, ReferenceState> {
    shard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

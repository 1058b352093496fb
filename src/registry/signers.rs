// Witness signer lists - versioned, consulted at every attestation check

use crate::identity::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors from signer list construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerListError {
    #[error("Signer list is empty")]
    Empty,

    #[error("Duplicate signer: {0}")]
    DuplicateSigner(AccountId),

    #[error("Signer {0} has zero weight")]
    ZeroWeight(AccountId),

    #[error("Quorum {quorum} is not reachable with total weight {total}")]
    UnreachableQuorum { quorum: u32, total: u32 },
}

/// One witness signer and its voting weight
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerEntry {
    pub account: AccountId,
    pub weight: u32,
}

impl SignerEntry {
    pub fn new(account: AccountId, weight: u32) -> Self {
        Self { account, weight }
    }
}

/// Ordered set of signers with a quorum threshold.
///
/// Every replacement bumps `version`; the quorum evaluator always reads the
/// current list, never a copy cached by a witness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerList {
    version: u64,
    entries: Vec<SignerEntry>,
    quorum: u32,
}

impl SignerList {
    /// Build a validated signer list at version 1
    pub fn new(entries: Vec<SignerEntry>, quorum: u32) -> Result<Self, SignerListError> {
        if entries.is_empty() {
            return Err(SignerListError::Empty);
        }

        let mut seen = HashSet::new();
        let mut total: u32 = 0;
        for entry in &entries {
            if !seen.insert(entry.account) {
                return Err(SignerListError::DuplicateSigner(entry.account));
            }
            if entry.weight == 0 {
                return Err(SignerListError::ZeroWeight(entry.account));
            }
            total = total.saturating_add(entry.weight);
        }

        if quorum == 0 || quorum > total {
            return Err(SignerListError::UnreachableQuorum { quorum, total });
        }

        Ok(Self {
            version: 1,
            entries,
            quorum,
        })
    }

    /// Equal-weight list where `quorum` signers must agree
    pub fn uniform(accounts: &[AccountId], quorum: u32) -> Result<Self, SignerListError> {
        Self::new(
            accounts.iter().map(|a| SignerEntry::new(*a, 1)).collect(),
            quorum,
        )
    }

    /// Replace this list's entries, keeping the version sequence
    pub(crate) fn superseded_by(&self, mut next: SignerList) -> SignerList {
        next.version = self.version + 1;
        next
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[SignerEntry] {
        &self.entries
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight of a signer, `None` if not on the list
    pub fn weight_of(&self, account: &AccountId) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| &e.account == account)
            .map(|e| e.weight)
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.weight_of(account).is_some()
    }

    /// Sum of all signer weights
    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.weight).sum()
    }
}

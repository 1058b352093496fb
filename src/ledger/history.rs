// Transaction history - the replayable record witnesses scan

use crate::claims::ClaimRef;
use crate::identity::AccountId;
use crate::ledger::SourceChain;
use crate::registry::{Amount, BridgeKey, ChainSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bridge commitment made on a source chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub bridge: BridgeKey,
    /// Chain the commitment was made on
    pub source: ChainSide,
    pub reference: ClaimRef,
    pub sender: AccountId,
    pub amount: Amount,
    /// Account to deliver to on the other chain, if named by the sender
    pub destination: Option<AccountId>,
    /// Reward paid with an account-create commit
    pub signature_reward: Option<Amount>,
}

impl Commitment {
    /// Door that received the committed funds
    pub fn door(&self) -> &AccountId {
        self.bridge.door(self.source)
    }
}

/// What a transaction did
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TxKind {
    Payment { to: AccountId, amount: Amount },
    AccountSet,
    DepositPreauth { authorized: AccountId },
    CreateClaimId { bridge: BridgeKey, claim_id: u64 },
    Commit(Commitment),
    AddAttestation { bridge: BridgeKey, reference: ClaimRef },
    Claim { bridge: BridgeKey, claim_id: u64, destination: AccountId, amount: Amount },
}

/// One applied transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxRecord {
    pub index: u64,
    pub account: AccountId,
    pub fee: i64,
    pub timestamp: DateTime<Utc>,
    pub kind: TxKind,
}

/// Immutable snapshot of a chain's history, shareable across witness tasks
#[derive(Clone, Debug)]
pub struct ChainHistory {
    side: ChainSide,
    records: Vec<TxRecord>,
}

impl ChainHistory {
    pub fn new(side: ChainSide, records: Vec<TxRecord>) -> Self {
        Self { side, records }
    }

    pub fn records(&self) -> &[TxRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SourceChain for ChainHistory {
    fn side(&self) -> ChainSide {
        self.side
    }

    fn latest_commitment(&self, bridge: &BridgeKey, reference: ClaimRef) -> Option<Commitment> {
        latest_commitment_in(&self.records, bridge, reference)
    }
}

pub(crate) fn latest_commitment_in(
    records: &[TxRecord],
    bridge: &BridgeKey,
    reference: ClaimRef,
) -> Option<Commitment> {
    records.iter().rev().find_map(|record| match &record.kind {
        TxKind::Commit(c) if &c.bridge == bridge && c.reference == reference => Some(c.clone()),
        _ => None,
    })
}

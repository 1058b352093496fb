// Bridge Events - ordered record of every successful bridge transaction

use crate::claims::ClaimKey;
use crate::identity::AccountId;
use crate::registry::{Amount, BridgeKey, ChainSide, SignerList};
use crate::witness::AttestedValue;

/// One successful bridge transaction and the balances it moved
#[derive(Clone, Debug)]
pub enum BridgeEvent {
    /// A bridge was registered with its initial signer list
    BridgeRegistered { bridge: BridgeKey, signers: SignerList },

    /// The signer list of a bridge was replaced
    SignerListChanged { bridge: BridgeKey, signers: SignerList },

    /// A fee-only transaction (modify bridge, account settings)
    FeeCharged {
        chain: ChainSide,
        account: AccountId,
        fee: i64,
    },

    /// A ClaimID was created; the reward is escrowed from the owner
    ClaimCreated {
        chain: ChainSide,
        owner: AccountId,
        reward: Amount,
        fee: i64,
    },

    /// Funds were committed to the source door
    Committed {
        chain: ChainSide,
        sender: AccountId,
        door: AccountId,
        amount: Amount,
        /// Present for account-create commits
        reward: Option<Amount>,
        fee: i64,
    },

    /// An attestation was accepted by the quorum evaluator
    AttestationSubmitted {
        chain: ChainSide,
        submitter: AccountId,
        fee: i64,
        key: ClaimKey,
        signer: AccountId,
        reward_account: AccountId,
        value: AttestedValue,
    },

    /// A ClaimID settled; the escrowed reward went to contributing signers
    Claimed {
        chain: ChainSide,
        key: ClaimKey,
        submitter: AccountId,
        destination: AccountId,
        door: AccountId,
        amount: Amount,
        reward: Amount,
        fee: i64,
    },

    /// An account-create sequence resolved, funded or forfeited
    AccountCreateResolved {
        chain: ChainSide,
        key: ClaimKey,
        door: AccountId,
        destination: AccountId,
        amount: Amount,
        reward: Amount,
        delivered: bool,
    },
}

/// Append-only log of bridge events
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<BridgeEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: BridgeEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events recorded from `mark` onward, as a new log
    pub fn since(&self, mark: usize) -> EventLog {
        EventLog {
            events: self.events.iter().skip(mark).cloned().collect(),
        }
    }
}

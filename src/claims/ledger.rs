// Claim Ledger - ClaimID table and account-create counters per bridge and chain

use crate::claims::{ClaimKey, ClaimRef, XChainClaim};
use crate::error::ErrorClass;
use crate::identity::AccountId;
use crate::ledger::{AccountState, BalanceChanges, Chain, Commitment, LedgerError, TxKind};
use crate::registry::{Amount, Bridge, BridgeKey, ChainSide};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from claim bookkeeping and commitments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("No claim id {id} (retired: {retired})")]
    NoClaimId { id: u64, retired: bool },

    #[error("Signature reward mismatch: bridge requires {expected}, got {got}")]
    RewardMismatch { expected: Amount, got: Amount },

    #[error("Account {0} does not exist on the destination chain")]
    NoAccount(AccountId),

    #[error("Account-create transfers are disabled on this bridge")]
    AccountCreateDisabled,

    #[error("Amount {got} is below the account-create minimum {min}")]
    BelowMinimum { min: Amount, got: Amount },

    #[error("Wrong asset: bridge moves {expected}, got {got}")]
    WrongAsset { expected: String, got: String },

    #[error("Invalid amount: {0}")]
    BadAmount(String),

    #[error("Transaction submitted to the {got} chain, expected {expected}")]
    WrongChain { expected: ChainSide, got: ChainSide },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ClaimError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ClaimError::NoClaimId { retired: true, .. } => ErrorClass::Fatal,
            ClaimError::NoClaimId { .. } | ClaimError::NoAccount(_) => ErrorClass::Referential,
            ClaimError::WrongAsset { .. } | ClaimError::BadAmount(_) => ErrorClass::Malformed,
            ClaimError::Ledger(e) => e.class(),
            _ => ErrorClass::Policy,
        }
    }
}

/// Claim state of one bridge on one chain
#[derive(Debug, Default)]
struct DoorClaims {
    next_claim_id: u64,
    claims: BTreeMap<u64, XChainClaim>,
    retired: BTreeSet<u64>,
    /// Account-create commits made on this chain
    account_create_count: u64,
    /// Account-create sequences resolved on this chain
    account_claim_count: u64,
}

/// Table of outstanding transfer intents across all bridges
#[derive(Debug, Default)]
pub struct ClaimLedger {
    doors: HashMap<(BridgeKey, ChainSide), DoorClaims>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn door(&self, bridge: &BridgeKey, side: ChainSide) -> Option<&DoorClaims> {
        self.doors.get(&(bridge.clone(), side))
    }

    fn door_mut(&mut self, bridge: &BridgeKey, side: ChainSide) -> &mut DoorClaims {
        self.doors.entry((bridge.clone(), side)).or_default()
    }

    /// Create a ClaimID on `chain`, escrowing the signature reward from `owner`
    pub fn create_claim(
        &mut self,
        bridge: &Bridge,
        chain: &mut Chain,
        owner: AccountId,
        signature_reward: &Amount,
        other_chain_source: Option<AccountId>,
    ) -> Result<XChainClaim, ClaimError> {
        if !chain.account_exists(&owner) {
            return Err(ClaimError::NoAccount(owner));
        }
        if signature_reward != bridge.signature_reward() {
            return Err(ClaimError::RewardMismatch {
                expected: bridge.signature_reward().clone(),
                got: signature_reward.clone(),
            });
        }

        let fee = chain.base_fee();
        chain.apply(
            BalanceChanges::new()
                .debit(owner, signature_reward)
                .fee(owner, fee),
        )?;

        let side = chain.side();
        let door = self.door_mut(bridge.key(), side);
        door.next_claim_id += 1;
        let id = door.next_claim_id;
        let claim = XChainClaim::new(
            id,
            bridge.key().clone(),
            side,
            owner,
            other_chain_source,
            signature_reward.clone(),
        );
        door.claims.insert(id, claim.clone());

        chain.record(
            owner,
            fee,
            TxKind::CreateClaimId {
                bridge: bridge.key().clone(),
                claim_id: id,
            },
        );
        info!(bridge = %bridge.key(), chain = %side, claim_id = id, %owner, "claim id created");
        Ok(claim)
    }

    /// Commit `amount` on the source `chain` against a ClaimID.
    ///
    /// The source chain does not know whether the id exists on the other
    /// chain; a commit against an unknown or retired id is accepted here and
    /// simply never settles.
    pub fn record_commitment(
        &mut self,
        bridge: &Bridge,
        chain: &mut Chain,
        sender: AccountId,
        claim_id: u64,
        amount: &Amount,
        destination: Option<AccountId>,
    ) -> Result<Commitment, ClaimError> {
        let source = chain.side();
        Self::check_asset(bridge, source, amount)?;

        let door = *bridge.door(source);
        let fee = chain.base_fee();
        chain.apply(
            BalanceChanges::new()
                .debit(sender, amount)
                .credit(door, amount)
                .fee(sender, fee),
        )?;

        let commitment = Commitment {
            bridge: bridge.key().clone(),
            source,
            reference: ClaimRef::Claim(claim_id),
            sender,
            amount: amount.clone(),
            destination,
            signature_reward: None,
        };
        chain.record(sender, fee, TxKind::Commit(commitment.clone()));
        info!(bridge = %bridge.key(), chain = %source, claim_id, %sender, %amount, "commit recorded");
        Ok(commitment)
    }

    /// Commit an account-create transfer; assigns the next sequence number
    pub fn commit_account_create(
        &mut self,
        bridge: &Bridge,
        chain: &mut Chain,
        sender: AccountId,
        destination: AccountId,
        amount: &Amount,
        signature_reward: &Amount,
    ) -> Result<Commitment, ClaimError> {
        let source = chain.side();
        let min = bridge
            .min_account_create()
            .ok_or(ClaimError::AccountCreateDisabled)?;
        Self::check_asset(bridge, source, amount)?;
        if !amount.is_native() {
            return Err(ClaimError::WrongAsset {
                expected: "NATIVE".into(),
                got: amount.asset().to_string(),
            });
        }
        if amount.value() < min.value() {
            return Err(ClaimError::BelowMinimum {
                min: min.clone(),
                got: amount.clone(),
            });
        }
        if signature_reward != bridge.signature_reward() {
            return Err(ClaimError::RewardMismatch {
                expected: bridge.signature_reward().clone(),
                got: signature_reward.clone(),
            });
        }

        let door = *bridge.door(source);
        let fee = chain.base_fee();
        chain.apply(
            BalanceChanges::new()
                .debit(sender, amount)
                .debit(sender, signature_reward)
                .credit(door, amount)
                .credit(door, signature_reward)
                .fee(sender, fee),
        )?;

        let counters = self.door_mut(bridge.key(), source);
        counters.account_create_count += 1;
        let sequence = counters.account_create_count;

        let commitment = Commitment {
            bridge: bridge.key().clone(),
            source,
            reference: ClaimRef::CreateSequence(sequence),
            sender,
            amount: amount.clone(),
            destination: Some(destination),
            signature_reward: Some(signature_reward.clone()),
        };
        chain.record(sender, fee, TxKind::Commit(commitment.clone()));
        info!(bridge = %bridge.key(), chain = %source, sequence, %sender, %destination, %amount, "account create committed");
        Ok(commitment)
    }

    /// Look up a live ClaimID
    pub fn claim(&self, bridge: &BridgeKey, side: ChainSide, id: u64) -> Result<&XChainClaim, ClaimError> {
        let door = self.door(bridge, side);
        door.and_then(|d| d.claims.get(&id)).ok_or(ClaimError::NoClaimId {
            id,
            retired: door.map(|d| d.retired.contains(&id)).unwrap_or(false),
        })
    }

    /// Number of live ClaimIDs of a bridge on a chain
    pub fn open_claims(&self, bridge: &BridgeKey, side: ChainSide) -> usize {
        self.door(bridge, side).map(|d| d.claims.len()).unwrap_or(0)
    }

    /// Account-create commits made from `side`
    pub fn account_create_count(&self, bridge: &BridgeKey, side: ChainSide) -> u64 {
        self.door(bridge, side).map(|d| d.account_create_count).unwrap_or(0)
    }

    /// Account-create sequences resolved on `side`
    pub fn account_claim_count(&self, bridge: &BridgeKey, side: ChainSide) -> u64 {
        self.door(bridge, side).map(|d| d.account_claim_count).unwrap_or(0)
    }

    /// The only sequence that may resolve next on `side`
    pub fn next_sequence(&self, bridge: &BridgeKey, side: ChainSide) -> u64 {
        self.account_claim_count(bridge, side) + 1
    }

    /// Retire a reference so it can never settle again.
    ///
    /// ClaimIDs are removed and remembered as retired. A create sequence may
    /// only be retired when it is the next in order.
    pub fn retire(&mut self, key: &ClaimKey) -> Result<(), ClaimError> {
        let door = self.door_mut(&key.bridge, key.destination);
        match key.reference {
            ClaimRef::Claim(id) => {
                if door.claims.remove(&id).is_none() {
                    return Err(ClaimError::NoClaimId {
                        id,
                        retired: door.retired.contains(&id),
                    });
                }
                door.retired.insert(id);
            }
            ClaimRef::CreateSequence(seq) => {
                if seq != door.account_claim_count + 1 {
                    return Err(ClaimError::NoClaimId {
                        id: seq,
                        retired: seq <= door.account_claim_count,
                    });
                }
                door.account_claim_count = seq;
            }
        }
        debug!(claim = %key, "reference retired");
        Ok(())
    }

    fn check_asset(bridge: &Bridge, side: ChainSide, amount: &Amount) -> Result<(), ClaimError> {
        let expected = bridge.asset(side);
        if amount.asset() != expected {
            return Err(ClaimError::WrongAsset {
                expected: expected.to_string(),
                got: amount.asset().to_string(),
            });
        }
        if !amount.is_positive() {
            return Err(ClaimError::BadAmount(format!("must be positive, got {}", amount.value())));
        }
        Ok(())
    }
}

// Settlement Engine - exactly-once release of attested transfers

use crate::claims::{ClaimError, ClaimKey, ClaimLedger, ClaimRef};
use crate::error::ErrorClass;
use crate::identity::AccountId;
use crate::ledger::{AccountState, BalanceChanges, Chain, LedgerError, TxKind};
use crate::quorum::{QuorumEvaluator, QuorumSet, QuorumState, QuorumStatus, ReattestPolicy};
use crate::registry::{Amount, Bridge, BridgeKey};
use crate::settlement::{split_reward, RemainderPolicy, RewardSplit};
use crate::witness::AttestedValue;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from a settlement attempt. A failed attempt changes nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("No quorum for {key} at amount {amount}: weight {weight} of {threshold}")]
    ClaimNoQuorum {
        key: String,
        amount: i64,
        weight: u32,
        threshold: u32,
    },

    #[error("{destination} requires deposit preauthorization for {submitter}")]
    NoPermission {
        destination: AccountId,
        submitter: AccountId,
    },

    #[error("Funds must go to {expected}, not {got}")]
    DestinationMismatch { expected: AccountId, got: AccountId },

    #[error("Destination {0} does not exist")]
    NoDestination(AccountId),

    #[error("Invalid amount: {0}")]
    BadAmount(String),

    #[error("Attested value for {0} is missing account-create fields")]
    IncompleteAttestation(String),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SettlementError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SettlementError::ClaimNoQuorum { .. } => ErrorClass::QuorumPending,
            SettlementError::NoPermission { .. } => ErrorClass::Permission,
            SettlementError::DestinationMismatch { .. } => ErrorClass::Policy,
            SettlementError::NoDestination(_) => ErrorClass::Referential,
            SettlementError::BadAmount(_) | SettlementError::IncompleteAttestation(_) => {
                ErrorClass::Malformed
            }
            SettlementError::Claim(e) => e.class(),
            SettlementError::Ledger(e) => e.class(),
        }
    }
}

/// Configuration for settlement and attestation handling
#[derive(Clone, Debug, Default)]
pub struct SettlementConfig {
    /// What a signer re-attesting a different value does
    pub reattest_policy: ReattestPolicy,
    /// Release a ClaimID as soon as quorum is reached on attestations
    /// that name a destination, without waiting for an explicit claim
    pub auto_settle_with_destination: bool,
    /// Receiver of reward rounding remainders
    pub remainder: RemainderPolicy,
}

impl SettlementConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reattest_policy(mut self, policy: ReattestPolicy) -> Self {
        self.reattest_policy = policy;
        self
    }

    pub fn with_auto_settle_with_destination(mut self, enabled: bool) -> Self {
        self.auto_settle_with_destination = enabled;
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }
}

/// An explicit claim of a ClaimID
#[derive(Clone, Debug)]
pub struct ClaimRequest {
    pub bridge: BridgeKey,
    pub claim_id: u64,
    /// Account submitting the claim; need not be the owner
    pub submitter: AccountId,
    pub destination: AccountId,
    /// Amount in the destination chain's asset
    pub amount: Amount,
}

/// A completed settlement
#[derive(Clone, Debug)]
pub struct Settlement {
    pub key: ClaimKey,
    pub destination: AccountId,
    pub amount: Amount,
    /// False when the principal was withheld (account-create forfeiture)
    pub delivered: bool,
    /// Reward pool that was split
    pub reward: Amount,
    pub rewards: RewardSplit,
    pub contributors: Vec<AccountId>,
}

/// Result of trying to resolve an account-create sequence
#[derive(Clone, Debug)]
pub enum SettlementOutcome {
    Settled(Settlement),
    /// Sequence destroyed without delivering the principal
    Forfeited(Settlement),
    /// Quorum reached, but an earlier sequence is unresolved
    Held { sequence: u64, next: u64 },
    /// Quorum not reached yet
    Pending(QuorumState),
}

impl SettlementOutcome {
    pub fn settlement(&self) -> Option<&Settlement> {
        match self {
            SettlementOutcome::Settled(s) | SettlementOutcome::Forfeited(s) => Some(s),
            _ => None,
        }
    }
}

/// Releases funds once quorum is established
#[derive(Debug, Default)]
pub struct SettlementEngine {
    config: SettlementConfig,
}

impl SettlementEngine {
    pub fn new(config: SettlementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Claim a ClaimID on `chain`.
    ///
    /// Fails fast without waiting: `NoClaimId` for unknown or retired ids,
    /// `ClaimNoQuorum` unless signers reaching quorum attested exactly
    /// `request.amount`.
    pub fn claim(
        &self,
        bridge: &Bridge,
        claims: &mut ClaimLedger,
        evaluator: &QuorumEvaluator,
        chain: &mut Chain,
        request: &ClaimRequest,
    ) -> Result<Settlement, SettlementError> {
        let fee = chain.base_fee();
        self.release(bridge, claims, evaluator, chain, request, fee)
    }

    /// Release a ClaimID whose quorum value names a destination.
    ///
    /// Runs as part of the attestation that completed quorum, so no extra
    /// fee is charged. Without quorum or an attested destination the claim
    /// stays `Pending` for an explicit claim.
    pub fn auto_claim(
        &self,
        bridge: &Bridge,
        claims: &mut ClaimLedger,
        evaluator: &QuorumEvaluator,
        chain: &mut Chain,
        claim_id: u64,
        submitter: AccountId,
    ) -> Result<SettlementOutcome, SettlementError> {
        let side = chain.side();
        let key = ClaimKey::new(bridge.key().clone(), side, ClaimRef::Claim(claim_id));
        claims.claim(bridge.key(), side, claim_id)?;

        let state = evaluator.state(&key, bridge.signers());
        let destination = match (&state.leading_value, state.has_quorum()) {
            (Some(value), true) => value.destination.map(|d| (d, value.amount.value())),
            _ => None,
        };
        let Some((destination, value)) = destination else {
            return Ok(SettlementOutcome::Pending(state));
        };

        let request = ClaimRequest {
            bridge: bridge.key().clone(),
            claim_id,
            submitter,
            destination,
            amount: Amount::new(bridge.asset(side).clone(), value),
        };
        self.release(bridge, claims, evaluator, chain, &request, 0)
            .map(SettlementOutcome::Settled)
    }

    fn release(
        &self,
        bridge: &Bridge,
        claims: &mut ClaimLedger,
        evaluator: &QuorumEvaluator,
        chain: &mut Chain,
        request: &ClaimRequest,
        fee: i64,
    ) -> Result<Settlement, SettlementError> {
        let side = chain.side();
        let key = ClaimKey::new(bridge.key().clone(), side, ClaimRef::Claim(request.claim_id));
        let claim = claims.claim(bridge.key(), side, request.claim_id)?.clone();

        if request.amount.asset() != bridge.asset(side) {
            return Err(SettlementError::BadAmount(format!(
                "claim must be in {}, got {}",
                bridge.asset(side),
                request.amount.asset()
            )));
        }

        let wanted = request.amount.value();
        let quorum = self.require_quorum(
            bridge,
            evaluator,
            &key,
            |value| value.amount.value() == wanted,
            Some(wanted),
        )?;

        let expected = quorum.value.destination.unwrap_or(*claim.owner());
        if request.destination != expected {
            return Err(SettlementError::DestinationMismatch {
                expected,
                got: request.destination,
            });
        }
        let destination = request.destination;
        if !chain.account_exists(&destination) {
            return Err(SettlementError::NoDestination(destination));
        }
        if chain.deposit_auth_enabled(&destination)
            && request.submitter != destination
            && !chain.is_preauthorized(&destination, &request.submitter)
        {
            return Err(SettlementError::NoPermission {
                destination,
                submitter: request.submitter,
            });
        }

        let door = *bridge.door(side);
        let rewards = split_reward(
            claim.signature_reward(),
            &quorum.reward_accounts(),
            self.config.remainder.resolve(&door),
        );

        let mut changes = BalanceChanges::new()
            .debit(door, &request.amount)
            .credit(destination, &request.amount);
        if fee > 0 {
            changes = changes.fee(request.submitter, fee);
        }
        for (account, amount) in rewards.credits() {
            changes = changes.credit(*account, amount).create(*account);
        }
        chain.apply(changes)?;

        claims.retire(&key)?;
        evaluator.finish(&key, QuorumStatus::Settled);
        chain.record(
            request.submitter,
            fee,
            TxKind::Claim {
                bridge: bridge.key().clone(),
                claim_id: request.claim_id,
                destination,
                amount: request.amount.clone(),
            },
        );

        info!(
            claim = %key,
            %destination,
            amount = %request.amount,
            signers = quorum.contributors.len(),
            "claim settled"
        );
        Ok(Settlement {
            key,
            destination,
            amount: request.amount.clone(),
            delivered: true,
            reward: claim.signature_reward().clone(),
            rewards,
            contributors: quorum.contributors.iter().map(|(signer, _)| *signer).collect(),
        })
    }

    /// Resolve account-create `sequence` on `chain` if it has quorum and is
    /// next in order.
    ///
    /// A later sequence that reaches quorum first is `Held`; it settles on a
    /// subsequent attempt once every earlier sequence has resolved.
    pub fn auto_settle(
        &self,
        bridge: &Bridge,
        claims: &mut ClaimLedger,
        evaluator: &QuorumEvaluator,
        chain: &mut Chain,
        sequence: u64,
    ) -> Result<SettlementOutcome, SettlementError> {
        let side = chain.side();
        let key = ClaimKey::new(bridge.key().clone(), side, ClaimRef::CreateSequence(sequence));

        let state = evaluator.state(&key, bridge.signers());
        if !state.has_quorum() {
            return Ok(SettlementOutcome::Pending(state));
        }

        let next = claims.next_sequence(bridge.key(), side);
        if sequence < next {
            return Err(ClaimError::NoClaimId {
                id: sequence,
                retired: true,
            }
            .into());
        }
        if sequence > next {
            info!(claim = %key, next, "sequence held behind an unresolved predecessor");
            return Ok(SettlementOutcome::Held { sequence, next });
        }

        let required = bridge.signature_reward();
        let quorum = self.require_quorum(
            bridge,
            evaluator,
            &key,
            |v| v.signature_reward.as_ref() == Some(required),
            None,
        )?;
        let value = &quorum.value;
        let (destination, reward) = match (value.destination, value.signature_reward.as_ref()) {
            (Some(destination), Some(reward)) => (destination, reward.clone()),
            _ => return Err(SettlementError::IncompleteAttestation(key.to_string())),
        };
        let amount = Amount::new(bridge.asset(side).clone(), value.amount.value());
        let door = *bridge.door(side);

        let delivered = !chain.account_exists(&destination)
            || !chain.deposit_auth_enabled(&destination)
            || chain.is_preauthorized(&destination, &door);

        let rewards = split_reward(
            &reward,
            &quorum.reward_accounts(),
            self.config.remainder.resolve(&door),
        );

        let mut changes = BalanceChanges::new().debit(door, &reward);
        if delivered {
            changes = changes
                .debit(door, &amount)
                .credit(destination, &amount)
                .create(destination);
        }
        for (account, credit) in rewards.credits() {
            changes = changes.credit(*account, credit).create(*account);
        }
        chain.apply(changes)?;

        claims.retire(&key)?;
        let settlement = Settlement {
            key: key.clone(),
            destination,
            amount,
            delivered,
            reward,
            rewards,
            contributors: quorum.contributors.iter().map(|(signer, _)| *signer).collect(),
        };

        if delivered {
            evaluator.finish(&key, QuorumStatus::Settled);
            info!(claim = %key, %destination, amount = %settlement.amount, "account create settled");
            Ok(SettlementOutcome::Settled(settlement))
        } else {
            evaluator.finish(&key, QuorumStatus::Destroyed);
            warn!(claim = %key, %destination, "destination refuses deposits; sequence destroyed without funding");
            Ok(SettlementOutcome::Forfeited(settlement))
        }
    }

    fn require_quorum<F>(
        &self,
        bridge: &Bridge,
        evaluator: &QuorumEvaluator,
        key: &ClaimKey,
        accept: F,
        amount: Option<i64>,
    ) -> Result<QuorumSet, SettlementError>
    where
        F: Fn(&AttestedValue) -> bool,
    {
        evaluator
            .quorum_where(key, bridge.signers(), accept)
            .ok_or_else(|| {
                let tally = evaluator.tally(key, bridge.signers());
                let weight = tally
                    .groups
                    .iter()
                    .filter(|g| amount.map_or(true, |v| g.value.amount.value() == v))
                    .map(|g| g.weight)
                    .max()
                    .unwrap_or(0);
                SettlementError::ClaimNoQuorum {
                    key: key.to_string(),
                    amount: amount.unwrap_or(0),
                    weight,
                    threshold: bridge.signers().quorum(),
                }
            })
    }
}


// Bridge Network - two chains and the bridge core wired together
//
// Every successful transaction is appended to the event log; a failed one
// changes no balance, no claim and no quorum state.

use crate::claims::{ClaimError, ClaimKey, ClaimLedger, ClaimRef, XChainClaim};
use crate::error::BridgeError;
use crate::identity::AccountId;
use crate::ledger::{
    AccountState, BalanceChanges, Chain, ChainConfig, ChainHistory, Commitment, LedgerError, TxKind,
};
use crate::quorum::{QuorumEvaluator, QuorumState};
use crate::reconcile::{BalanceAssertions, BalanceSnapshot, BridgeEvent, EventLog, Reconciler};
use crate::registry::{
    Amount, Asset, Bridge, BridgeKey, BridgeModification, BridgeRegistry, BridgeSpec, ChainSide,
    SignerList,
};
use crate::settlement::{
    ClaimRequest, Settlement, SettlementConfig, SettlementEngine, SettlementOutcome,
};
use crate::witness::{Attestation, AttestationRequest, WitnessNode};
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for a bridge network
#[derive(Clone, Debug, Default)]
pub struct NetworkConfig {
    pub locking: ChainConfig,
    pub issuing: ChainConfig,
    pub settlement: SettlementConfig,
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locking(mut self, config: ChainConfig) -> Self {
        self.locking = config;
        self
    }

    pub fn with_issuing(mut self, config: ChainConfig) -> Self {
        self.issuing = config;
        self
    }

    pub fn with_settlement(mut self, config: SettlementConfig) -> Self {
        self.settlement = config;
        self
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.locking.validate()?;
        self.issuing.validate()?;
        Ok(())
    }
}

/// Result of submitting one attestation
#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub state: QuorumState,
    /// Set when the attestation triggered a settlement attempt
    pub settlement: Option<SettlementOutcome>,
}

// ============================================================================
// NETWORK
// ============================================================================

#[derive(Debug)]
struct Chains {
    locking: Chain,
    issuing: Chain,
}

impl Chains {
    fn get(&self, side: ChainSide) -> &Chain {
        match side {
            ChainSide::Locking => &self.locking,
            ChainSide::Issuing => &self.issuing,
        }
    }

    fn get_mut(&mut self, side: ChainSide) -> &mut Chain {
        match side {
            ChainSide::Locking => &mut self.locking,
            ChainSide::Issuing => &mut self.issuing,
        }
    }
}

/// The locking chain, the issuing chain, and the bridge state between them
#[derive(Debug)]
pub struct BridgeNetwork {
    chains: Chains,
    registry: BridgeRegistry,
    claims: ClaimLedger,
    evaluator: QuorumEvaluator,
    engine: SettlementEngine,
    events: EventLog,
}

impl BridgeNetwork {
    pub fn new(
        locking_master: AccountId,
        issuing_master: AccountId,
        config: NetworkConfig,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let NetworkConfig {
            locking,
            issuing,
            settlement,
        } = config;

        Ok(Self {
            chains: Chains {
                locking: Chain::new(ChainSide::Locking, locking_master, locking)?,
                issuing: Chain::new(ChainSide::Issuing, issuing_master, issuing)?,
            },
            registry: BridgeRegistry::new(),
            claims: ClaimLedger::new(),
            evaluator: QuorumEvaluator::new(settlement.reattest_policy),
            engine: SettlementEngine::new(settlement),
            events: EventLog::new(),
        })
    }

    pub fn chain(&self, side: ChainSide) -> &Chain {
        self.chains.get(side)
    }

    /// Direct chain access for setup (funding, issuing tokens)
    pub fn chain_mut(&mut self, side: ChainSide) -> &mut Chain {
        self.chains.get_mut(side)
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    pub fn claims(&self) -> &ClaimLedger {
        &self.claims
    }

    pub fn evaluator(&self) -> &QuorumEvaluator {
        &self.evaluator
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn settlement_config(&self) -> &SettlementConfig {
        self.engine.config()
    }

    /// Immutable history of `side` for witnesses to scan
    pub fn history(&self, side: ChainSide) -> Arc<ChainHistory> {
        Arc::new(self.chains.get(side).snapshot())
    }

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    pub fn register_bridge(&mut self, spec: BridgeSpec) -> Result<Bridge, BridgeError> {
        let bridge = self
            .registry
            .register(spec, &self.chains.locking, &self.chains.issuing)?;
        self.events.push(BridgeEvent::BridgeRegistered {
            bridge: bridge.key().clone(),
            signers: bridge.signers().clone(),
        });
        Ok(bridge)
    }

    pub fn modify_bridge(
        &mut self,
        key: &BridgeKey,
        modification: BridgeModification,
    ) -> Result<Bridge, BridgeError> {
        Ok(self
            .registry
            .modify(key, modification, &self.chains.locking, &self.chains.issuing)?)
    }

    /// Replace a bridge's signer list; later attestations are checked against it
    pub fn set_signer_list(&mut self, key: &BridgeKey, signers: SignerList) -> Result<u64, BridgeError> {
        let version = self.registry.set_signer_list(key, signers)?;
        let bridge = self.registry.bridge(key)?;
        self.events.push(BridgeEvent::SignerListChanged {
            bridge: key.clone(),
            signers: bridge.signers().clone(),
        });
        info!(bridge = %key, version, "signer list updated");
        Ok(version)
    }

    // ------------------------------------------------------------------------
    // Account settings
    // ------------------------------------------------------------------------

    pub fn set_deposit_auth(
        &mut self,
        side: ChainSide,
        account: AccountId,
        enabled: bool,
    ) -> Result<(), BridgeError> {
        let chain = self.chains.get_mut(side);
        chain.set_deposit_auth(account, enabled)?;
        self.events.push(BridgeEvent::FeeCharged {
            chain: side,
            account,
            fee: chain.base_fee(),
        });
        Ok(())
    }

    pub fn preauthorize(
        &mut self,
        side: ChainSide,
        account: AccountId,
        authorized: AccountId,
    ) -> Result<(), BridgeError> {
        let chain = self.chains.get_mut(side);
        chain.preauthorize(account, authorized)?;
        self.events.push(BridgeEvent::FeeCharged {
            chain: side,
            account,
            fee: chain.base_fee(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Claims and commitments
    // ------------------------------------------------------------------------

    /// Create a ClaimID on the `destination` chain
    pub fn create_claim(
        &mut self,
        key: &BridgeKey,
        destination: ChainSide,
        owner: AccountId,
        signature_reward: &Amount,
        other_chain_source: Option<AccountId>,
    ) -> Result<XChainClaim, BridgeError> {
        let bridge = self.registry.bridge(key)?;
        let chain = self.chains.get_mut(destination);
        let claim = self
            .claims
            .create_claim(bridge, chain, owner, signature_reward, other_chain_source)?;
        self.events.push(BridgeEvent::ClaimCreated {
            chain: destination,
            owner,
            reward: signature_reward.clone(),
            fee: chain.base_fee(),
        });
        Ok(claim)
    }

    /// Commit `amount` from `sender` on the `source` chain against a ClaimID
    pub fn commit(
        &mut self,
        key: &BridgeKey,
        source: ChainSide,
        sender: AccountId,
        claim_id: u64,
        amount: &Amount,
        destination: Option<AccountId>,
    ) -> Result<Commitment, BridgeError> {
        let bridge = self.registry.bridge(key)?;
        let chain = self.chains.get_mut(source);
        let commitment = self
            .claims
            .record_commitment(bridge, chain, sender, claim_id, amount, destination)?;
        self.events.push(BridgeEvent::Committed {
            chain: source,
            sender,
            door: *commitment.door(),
            amount: amount.clone(),
            reward: None,
            fee: chain.base_fee(),
        });
        Ok(commitment)
    }

    /// Commit an account-create transfer from `source`
    pub fn commit_account_create(
        &mut self,
        key: &BridgeKey,
        source: ChainSide,
        sender: AccountId,
        destination: AccountId,
        amount: &Amount,
        signature_reward: &Amount,
    ) -> Result<Commitment, BridgeError> {
        let bridge = self.registry.bridge(key)?;
        let chain = self.chains.get_mut(source);
        let commitment = self.claims.commit_account_create(
            bridge,
            chain,
            sender,
            destination,
            amount,
            signature_reward,
        )?;
        self.events.push(BridgeEvent::Committed {
            chain: source,
            sender,
            door: *commitment.door(),
            amount: amount.clone(),
            reward: Some(signature_reward.clone()),
            fee: chain.base_fee(),
        });
        Ok(commitment)
    }

    // ------------------------------------------------------------------------
    // Attestations
    // ------------------------------------------------------------------------

    /// Ask `witness` to attest a commitment made on the `source` chain
    pub fn attest(
        &self,
        witness: &WitnessNode,
        source: ChainSide,
        request: &AttestationRequest,
    ) -> Result<Attestation, BridgeError> {
        Ok(witness.attest(self.chains.get(source), request)?)
    }

    /// Submit an attestation to its destination chain on behalf of `submitter`.
    ///
    /// Reaching quorum on an account-create sequence settles it when it is
    /// next in order. A ClaimID settles only with `auto_settle_with_destination`
    /// and an attested destination. Settlement failures here are logged and
    /// leave the reference open.
    pub fn submit_attestation(
        &mut self,
        attestation: &Attestation,
        submitter: AccountId,
    ) -> Result<SubmissionOutcome, BridgeError> {
        let key = attestation.key().clone();
        let side = key.destination;
        let bridge = self.registry.bridge(&key.bridge)?;
        let value = attestation.value();

        let source = key.source();
        if value.was_locking_chain_send != (source == ChainSide::Locking) {
            let sent_from = if value.was_locking_chain_send {
                ChainSide::Locking
            } else {
                ChainSide::Issuing
            };
            return Err(ClaimError::WrongChain {
                expected: source,
                got: sent_from,
            }
            .into());
        }
        if value.amount.asset() != bridge.asset(source) {
            return Err(ClaimError::WrongAsset {
                expected: bridge.asset(source).to_string(),
                got: value.amount.asset().to_string(),
            }
            .into());
        }

        match key.reference {
            ClaimRef::Claim(id) => {
                let claim = self.claims.claim(&key.bridge, side, id)?;
                if let Some(bound) = claim.other_chain_source() {
                    if *bound != value.sender {
                        return Err(BridgeError::SenderMismatch {
                            expected: *bound,
                            got: value.sender,
                        });
                    }
                }
            }
            ClaimRef::CreateSequence(sequence) => {
                if sequence < self.claims.next_sequence(&key.bridge, side) {
                    return Err(ClaimError::NoClaimId {
                        id: sequence,
                        retired: true,
                    }
                    .into());
                }
                // account-create rewards are paid at the rate required now
                if value.signature_reward.as_ref() != Some(bridge.signature_reward()) {
                    return Err(ClaimError::RewardMismatch {
                        expected: bridge.signature_reward().clone(),
                        got: value
                            .signature_reward
                            .clone()
                            .unwrap_or_else(|| bridge.signature_reward().with_value(0)),
                    }
                    .into());
                }
            }
        }

        let chain = self.chains.get_mut(side);
        let fee = chain.base_fee();
        if !chain.account_exists(&submitter) {
            return Err(LedgerError::NoAccount(submitter).into());
        }
        let available = chain.native_balance(&submitter);
        if available < fee {
            return Err(LedgerError::Unfunded {
                account: submitter,
                asset: Asset::Native,
                available,
                required: fee,
            }
            .into());
        }

        let state = self.evaluator.submit(attestation, bridge.signers())?;

        chain.apply(BalanceChanges::new().fee(submitter, fee))?;
        chain.record(
            submitter,
            fee,
            TxKind::AddAttestation {
                bridge: key.bridge.clone(),
                reference: key.reference,
            },
        );
        self.events.push(BridgeEvent::AttestationSubmitted {
            chain: side,
            submitter,
            fee,
            key: key.clone(),
            signer: *attestation.signer(),
            reward_account: *attestation.reward_account(),
            value: value.clone(),
        });

        if !state.has_quorum() {
            return Ok(SubmissionOutcome {
                state,
                settlement: None,
            });
        }

        let attempt = match key.reference {
            ClaimRef::CreateSequence(sequence) => Some(self.engine.auto_settle(
                bridge,
                &mut self.claims,
                &self.evaluator,
                chain,
                sequence,
            )),
            ClaimRef::Claim(id) if self.engine.config().auto_settle_with_destination => Some(
                self.engine
                    .auto_claim(bridge, &mut self.claims, &self.evaluator, chain, id, submitter),
            ),
            ClaimRef::Claim(_) => None,
        };

        let settlement = match attempt {
            Some(Ok(outcome)) => {
                if let Some(done) = outcome.settlement() {
                    let door = *bridge.door(side);
                    self.events.push(resolution_event(&key, side, door, submitter, 0, done));
                }
                Some(outcome)
            }
            Some(Err(e)) => {
                warn!(claim = %key, error = %e, "automatic settlement failed; reference stays open");
                None
            }
            None => None,
        };

        let state = self.evaluator.state(&key, bridge.signers());
        Ok(SubmissionOutcome { state, settlement })
    }

    // ------------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------------

    /// Claim a ClaimID on the `destination` chain
    pub fn claim(
        &mut self,
        destination: ChainSide,
        request: &ClaimRequest,
    ) -> Result<Settlement, BridgeError> {
        let bridge = self.registry.bridge(&request.bridge)?;
        let chain = self.chains.get_mut(destination);
        let fee = chain.base_fee();
        let settlement =
            self.engine
                .claim(bridge, &mut self.claims, &self.evaluator, chain, request)?;
        let door = *bridge.door(destination);
        self.events.push(resolution_event(
            &settlement.key,
            destination,
            door,
            request.submitter,
            fee,
            &settlement,
        ));
        Ok(settlement)
    }

    /// Retry settlement of an account-create sequence on the `destination` chain
    pub fn auto_settle(
        &mut self,
        key: &BridgeKey,
        destination: ChainSide,
        sequence: u64,
    ) -> Result<SettlementOutcome, BridgeError> {
        let bridge = self.registry.bridge(key)?;
        let chain = self.chains.get_mut(destination);
        let outcome =
            self.engine
                .auto_settle(bridge, &mut self.claims, &self.evaluator, chain, sequence)?;
        if let Some(done) = outcome.settlement() {
            let door = *bridge.door(destination);
            self.events
                .push(resolution_event(&done.key, destination, door, door, 0, done));
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------------

    /// Current balances of both chains
    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot::capture(&self.chains.locking, &self.chains.issuing)
    }

    /// Position in the event log, for `expected_since`
    pub fn mark(&self) -> usize {
        self.events.len()
    }

    /// Expected balance changes over the whole event log
    pub fn expected_balances(&self) -> BalanceAssertions {
        self.reconciler().expected_balances(&self.events)
    }

    /// Expected balance changes since `mark`
    pub fn expected_since(&self, mark: usize) -> BalanceAssertions {
        self.reconciler().expected_since(&self.events, mark)
    }

    /// Quorum state of a reference under its bridge's current signer list
    pub fn quorum_state(&self, key: &ClaimKey) -> Result<QuorumState, BridgeError> {
        let bridge = self.registry.bridge(&key.bridge)?;
        Ok(self.evaluator.state(key, bridge.signers()))
    }

    /// Release the evaluator's closed references; resolved ClaimIDs and
    /// sequences stay refused through the claim ledger
    pub fn prune_resolved(&self) -> usize {
        self.evaluator.prune_finished()
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.engine.config().remainder)
    }
}

fn resolution_event(
    key: &ClaimKey,
    chain: ChainSide,
    door: AccountId,
    submitter: AccountId,
    fee: i64,
    settlement: &Settlement,
) -> BridgeEvent {
    match key.reference {
        ClaimRef::Claim(_) => BridgeEvent::Claimed {
            chain,
            key: key.clone(),
            submitter,
            destination: settlement.destination,
            door,
            amount: settlement.amount.clone(),
            reward: settlement.reward.clone(),
            fee,
        },
        ClaimRef::CreateSequence(_) => BridgeEvent::AccountCreateResolved {
            chain,
            key: key.clone(),
            door,
            destination: settlement.destination,
            amount: settlement.amount.clone(),
            reward: settlement.reward.clone(),
            delivered: settlement.delivered,
        },
    }
}

// Balance Reconciliation - pure derivation of expected balance movements

use crate::claims::ClaimKey;
use crate::identity::AccountId;
use crate::ledger::Chain;
use crate::quorum::{tally, Vote};
use crate::reconcile::{BridgeEvent, EventLog};
use crate::registry::{Amount, Asset, BridgeKey, ChainSide, SignerList};
use crate::settlement::{split_reward, RemainderPolicy};
use crate::witness::AttestedValue;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

type BalanceKey = (ChainSide, AccountId, Asset);

/// Errors from checking chains against derived balances
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{account} on {chain} chain: expected {asset} change {expected}, got {actual}")]
    Mismatch {
        chain: ChainSide,
        account: AccountId,
        asset: String,
        expected: i64,
        actual: i64,
    },
}

/// Balances of both chains at one point in time
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    balances: BTreeMap<BalanceKey, i64>,
}

impl BalanceSnapshot {
    pub fn capture(locking: &Chain, issuing: &Chain) -> Self {
        let balances = [locking, issuing]
            .into_iter()
            .flat_map(|chain| {
                let side = chain.side();
                chain
                    .balances()
                    .into_iter()
                    .map(move |((account, asset), value)| ((side, account, asset), value))
            })
            .collect();
        Self { balances }
    }

    pub fn balance(&self, chain: ChainSide, account: &AccountId, asset: &Asset) -> i64 {
        self.balances
            .get(&(chain, *account, asset.clone()))
            .copied()
            .unwrap_or(0)
    }
}

/// Expected balance changes derived from an event log
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceAssertions {
    deltas: BTreeMap<BalanceKey, i64>,
}

impl BalanceAssertions {
    /// Expected change of one balance
    pub fn delta(&self, chain: ChainSide, account: &AccountId, asset: &Asset) -> i64 {
        self.deltas
            .get(&(chain, *account, asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Expected change of a native balance
    pub fn native_delta(&self, chain: ChainSide, account: &AccountId) -> i64 {
        self.delta(chain, account, &Asset::Native)
    }

    /// Balances expected once the logged events are applied to `before`
    pub fn expected_after(&self, before: &BalanceSnapshot) -> BalanceSnapshot {
        let mut balances = before.balances.clone();
        for (key, delta) in &self.deltas {
            *balances.entry(key.clone()).or_insert(0) += delta;
        }
        balances.retain(|_, value| *value != 0);
        BalanceSnapshot { balances }
    }

    /// Check that every balance moved exactly as derived, and nothing else moved
    pub fn verify(&self, before: &BalanceSnapshot, after: &BalanceSnapshot) -> Result<(), ReconcileError> {
        let keys: BTreeSet<&BalanceKey> = before
            .balances
            .keys()
            .chain(after.balances.keys())
            .chain(self.deltas.keys())
            .collect();

        for key in keys {
            let (chain, account, asset) = key;
            let expected = self.deltas.get(key).copied().unwrap_or(0);
            let actual = after.balances.get(key).copied().unwrap_or(0)
                - before.balances.get(key).copied().unwrap_or(0);
            if expected != actual {
                return Err(ReconcileError::Mismatch {
                    chain: *chain,
                    account: *account,
                    asset: asset.to_string(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn add(&mut self, chain: ChainSide, account: AccountId, amount: &Amount, sign: i64) {
        let asset = amount.asset();
        // issuer balances are mint and burn, not holdings
        if asset.issuer() == Some(&account) || amount.value() == 0 {
            return;
        }
        *self.deltas.entry((chain, account, asset.clone())).or_insert(0) += sign * amount.value();
    }

    fn credit(&mut self, chain: ChainSide, account: AccountId, amount: &Amount) {
        self.add(chain, account, amount, 1);
    }

    fn debit(&mut self, chain: ChainSide, account: AccountId, amount: &Amount) {
        self.add(chain, account, amount, -1);
    }

    fn fee(&mut self, chain: ChainSide, account: AccountId, fee: i64) {
        self.debit(chain, account, &Amount::native(fee));
    }
}

/// Replays an event log into expected balance changes.
///
/// Reward recipients are re-derived from the logged attestations with the
/// same tally the quorum evaluator uses, under the signer list in force when
/// each reference resolved.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    remainder: RemainderPolicy,
}

#[derive(Default)]
struct Replay {
    signers: HashMap<BridgeKey, SignerList>,
    votes: HashMap<ClaimKey, BTreeMap<AccountId, Vote>>,
}

impl Replay {
    /// Reward accounts of the heaviest quorum group accepted by `accept`
    fn contributors<F>(&mut self, key: &ClaimKey, accept: F) -> Vec<AccountId>
    where
        F: Fn(&AttestedValue) -> bool,
    {
        let votes = self.votes.remove(key).unwrap_or_default();
        let Some(signers) = self.signers.get(&key.bridge) else {
            return Vec::new();
        };
        tally(votes.values(), signers)
            .quorum_where(signers.quorum(), accept)
            .map(|group| group.reward_accounts())
            .unwrap_or_default()
    }
}

impl Reconciler {
    pub fn new(remainder: RemainderPolicy) -> Self {
        Self { remainder }
    }

    /// Expected balance changes over the whole log
    pub fn expected_balances(&self, log: &EventLog) -> BalanceAssertions {
        self.expected_since(log, 0)
    }

    /// Expected balance changes caused by events at index `from` onward.
    ///
    /// Earlier events are still replayed for signer lists and attestations.
    pub fn expected_since(&self, log: &EventLog, from: usize) -> BalanceAssertions {
        let mut replay = Replay::default();
        let mut earlier = BalanceAssertions::default();
        let mut counted = BalanceAssertions::default();

        for (index, event) in log.events().iter().enumerate() {
            let out = if index >= from { &mut counted } else { &mut earlier };
            self.apply(&mut replay, out, event);
        }
        debug!(events = log.len(), from, accounts = counted.deltas.len(), "balances derived");
        counted
    }

    fn apply(&self, replay: &mut Replay, out: &mut BalanceAssertions, event: &BridgeEvent) {
        match event {
            BridgeEvent::BridgeRegistered { bridge, signers }
            | BridgeEvent::SignerListChanged { bridge, signers } => {
                replay.signers.insert(bridge.clone(), signers.clone());
            }
            BridgeEvent::FeeCharged { chain, account, fee } => out.fee(*chain, *account, *fee),
            BridgeEvent::ClaimCreated {
                chain,
                owner,
                reward,
                fee,
            } => {
                out.debit(*chain, *owner, reward);
                out.fee(*chain, *owner, *fee);
            }
            BridgeEvent::Committed {
                chain,
                sender,
                door,
                amount,
                reward,
                fee,
            } => {
                out.debit(*chain, *sender, amount);
                out.credit(*chain, *door, amount);
                if let Some(reward) = reward {
                    out.debit(*chain, *sender, reward);
                    out.credit(*chain, *door, reward);
                }
                out.fee(*chain, *sender, *fee);
            }
            BridgeEvent::AttestationSubmitted {
                chain,
                submitter,
                fee,
                key,
                signer,
                reward_account,
                value,
            } => {
                out.fee(*chain, *submitter, *fee);
                replay.votes.entry(key.clone()).or_default().insert(
                    *signer,
                    Vote {
                        signer: *signer,
                        reward_account: *reward_account,
                        value: value.clone(),
                    },
                );
            }
            BridgeEvent::Claimed {
                chain,
                key,
                submitter,
                destination,
                door,
                amount,
                reward,
                fee,
            } => {
                out.debit(*chain, *door, amount);
                out.credit(*chain, *destination, amount);
                out.fee(*chain, *submitter, *fee);

                let claimed = amount.value();
                let recipients = replay.contributors(key, |v| v.amount.value() == claimed);
                self.pay_rewards(out, *chain, *door, reward, &recipients);
            }
            BridgeEvent::AccountCreateResolved {
                chain,
                key,
                door,
                destination,
                amount,
                reward,
                delivered,
            } => {
                if *delivered {
                    out.debit(*chain, *door, amount);
                    out.credit(*chain, *destination, amount);
                }
                out.debit(*chain, *door, reward);

                let recipients = replay.contributors(key, |v| v.signature_reward.as_ref() == Some(reward));
                self.pay_rewards(out, *chain, *door, reward, &recipients);
            }
        }
    }

    fn pay_rewards(
        &self,
        out: &mut BalanceAssertions,
        chain: ChainSide,
        door: AccountId,
        reward: &Amount,
        recipients: &[AccountId],
    ) {
        let split = split_reward(reward, recipients, self.remainder.resolve(&door));
        for (account, share) in split.credits() {
            out.credit(chain, *account, share);
        }
    }
}

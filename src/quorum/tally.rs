// Tally - pure weight accounting over one reference's votes

use crate::identity::AccountId;
use crate::registry::SignerList;
use crate::witness::AttestedValue;

/// A signer's latest attestation for a reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub signer: AccountId,
    pub reward_account: AccountId,
    pub value: AttestedValue,
}

/// Signers that agree on one value, and their combined weight
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuorumSet {
    pub value: AttestedValue,
    pub weight: u32,
    /// `(signer, reward account)` in signer order
    pub contributors: Vec<(AccountId, AccountId)>,
}

impl QuorumSet {
    pub fn reward_accounts(&self) -> Vec<AccountId> {
        self.contributors.iter().map(|(_, reward)| *reward).collect()
    }
}

/// Weight totals for one reference under a signer list
#[derive(Clone, Debug, Default)]
pub struct Tally {
    /// Weight of every distinct listed signer that voted, whatever the value
    pub cumulative_weight: u32,
    /// One entry per distinct value
    pub groups: Vec<QuorumSet>,
}

impl Tally {
    /// The best-supported value (earliest wins ties)
    pub fn leading(&self) -> Option<&QuorumSet> {
        self.groups
            .iter()
            .fold(None, |best: Option<&QuorumSet>, group| match best {
                Some(b) if b.weight >= group.weight => Some(b),
                _ => Some(group),
            })
    }

    /// Best-supported value satisfying `accept` whose weight meets `quorum`
    pub fn quorum_where<F>(&self, quorum: u32, accept: F) -> Option<&QuorumSet>
    where
        F: Fn(&AttestedValue) -> bool,
    {
        self.groups
            .iter()
            .filter(|g| g.weight >= quorum && accept(&g.value))
            .fold(None, |best: Option<&QuorumSet>, group| match best {
                Some(b) if b.weight >= group.weight => Some(b),
                _ => Some(group),
            })
    }
}

/// Count votes against the current signer list.
///
/// Votes from signers no longer on the list carry no weight. Each signer
/// contributes at most once, so the cumulative weight never exceeds the
/// list's total weight.
pub fn tally<'a, I>(votes: I, signers: &SignerList) -> Tally
where
    I: IntoIterator<Item = &'a Vote>,
{
    let mut result = Tally::default();

    for vote in votes {
        let Some(weight) = signers.weight_of(&vote.signer) else {
            continue;
        };
        result.cumulative_weight = result.cumulative_weight.saturating_add(weight);

        match result.groups.iter_mut().find(|g| g.value == vote.value) {
            Some(group) => {
                group.weight = group.weight.saturating_add(weight);
                group.contributors.push((vote.signer, vote.reward_account));
            }
            None => result.groups.push(QuorumSet {
                value: vote.value.clone(),
                weight,
                contributors: vec![(vote.signer, vote.reward_account)],
            }),
        }
    }

    result
}

use crate::identity::AccountId;
use crate::registry::{Amount, BridgeKey, ChainSide};
use serde::{Deserialize, Serialize};

/// An explicit ClaimID on the destination chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XChainClaim {
    id: u64,
    bridge: BridgeKey,
    destination: ChainSide,
    owner: AccountId,
    other_chain_source: Option<AccountId>,
    /// Reward escrowed from the owner at creation, at the rate then in force
    signature_reward: Amount,
}

impl XChainClaim {
    pub(crate) fn new(
        id: u64,
        bridge: BridgeKey,
        destination: ChainSide,
        owner: AccountId,
        other_chain_source: Option<AccountId>,
        signature_reward: Amount,
    ) -> Self {
        Self {
            id,
            bridge,
            destination,
            owner,
            other_chain_source,
            signature_reward,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bridge(&self) -> &BridgeKey {
        &self.bridge
    }

    pub fn destination(&self) -> ChainSide {
        self.destination
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Sender the owner expects on the source chain, if bound
    pub fn other_chain_source(&self) -> Option<&AccountId> {
        self.other_chain_source.as_ref()
    }

    pub fn signature_reward(&self) -> &Amount {
        &self.signature_reward
    }
}

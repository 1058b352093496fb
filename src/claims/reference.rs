use crate::registry::{BridgeKey, ChainSide};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference a commitment is made against.
///
/// `Claim` ids are created explicitly on the destination chain and can be
/// claimed by anyone once attested. `CreateSequence` numbers are assigned
/// implicitly by account-create commits and resolve strictly in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimRef {
    Claim(u64),
    CreateSequence(u64),
}

impl ClaimRef {
    pub fn number(&self) -> u64 {
        match self {
            ClaimRef::Claim(n) | ClaimRef::CreateSequence(n) => *n,
        }
    }

    pub fn is_create_sequence(&self) -> bool {
        matches!(self, ClaimRef::CreateSequence(_))
    }
}

impl fmt::Display for ClaimRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimRef::Claim(n) => write!(f, "claim#{}", n),
            ClaimRef::CreateSequence(n) => write!(f, "create#{}", n),
        }
    }
}

/// Fully-qualified reference: bridge, destination chain, and reference
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimKey {
    pub bridge: BridgeKey,
    /// Chain the funds are released on
    pub destination: ChainSide,
    pub reference: ClaimRef,
}

impl ClaimKey {
    pub fn new(bridge: BridgeKey, destination: ChainSide, reference: ClaimRef) -> Self {
        Self {
            bridge,
            destination,
            reference,
        }
    }

    /// Chain the commitment was made on
    pub fn source(&self) -> ChainSide {
        self.destination.opposite()
    }

    /// Bytes used as a storage key
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.reference, self.destination)
    }
}

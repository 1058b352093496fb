// Interfaces the bridge core consumes from the chains

use crate::claims::ClaimRef;
use crate::identity::AccountId;
use crate::ledger::Commitment;
use crate::registry::{BridgeKey, ChainSide};

/// Read access to a source chain's committed history.
///
/// Witnesses derive every attestation from this interface alone, so an
/// implementation must be a pure view of history.
pub trait SourceChain: Send + Sync {
    /// Chain this history belongs to
    fn side(&self) -> ChainSide;

    /// Latest commitment for `reference` on `bridge`, if one was ever made
    fn latest_commitment(&self, bridge: &BridgeKey, reference: ClaimRef) -> Option<Commitment>;
}

/// Account questions asked by the registry and the settlement engine
pub trait AccountState {
    fn account_exists(&self, account: &AccountId) -> bool;

    fn deposit_auth_enabled(&self, account: &AccountId) -> bool;

    /// Whether `account` has preauthorized deposits from `sender`
    fn is_preauthorized(&self, account: &AccountId, sender: &AccountId) -> bool;

    /// Transfer fee charged by an issuer, in billionths (0 = none)
    fn transfer_rate(&self, issuer: &AccountId) -> u32;

    /// The chain's genesis account
    fn master_account(&self) -> AccountId;
}

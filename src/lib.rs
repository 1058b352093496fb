// XChain Bridge
// Witness attestation, weighted quorum and exactly-once settlement between a
// locking chain and an issuing chain

pub mod claims;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod network;
pub mod quorum;
pub mod reconcile;
pub mod registry;
pub mod settlement;
pub mod witness;

pub use error::{BridgeError, ErrorClass};
pub use network::{BridgeNetwork, NetworkConfig, SubmissionOutcome};

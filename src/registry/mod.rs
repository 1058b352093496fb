// Registry module - THE BRIDGE TABLE
// Canonical bridge definitions, the assets they move, and their witness signer lists

mod asset;
mod bridge;
mod registry;
mod signers;

pub use asset::{Amount, Asset};
pub use bridge::{Bridge, BridgeKey, BridgeModification, BridgeSpec, ChainSide};
pub use registry::{BridgeRegistry, RegistryError};
pub use signers::{SignerEntry, SignerList, SignerListError};

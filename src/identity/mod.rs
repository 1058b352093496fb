// Identity module - witness signing keys and account identifiers

mod account;
mod keypair;
mod signer;

pub use account::*;
pub use keypair::*;
pub use signer::*;

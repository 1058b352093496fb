// Claims module - OUTSTANDING TRANSFER INTENTS
// ClaimID tickets, account-create sequence counters, and commitments against them

mod claim;
mod ledger;
mod reference;

pub use claim::XChainClaim;
pub use ledger::{ClaimError, ClaimLedger};
pub use reference::{ClaimKey, ClaimRef};

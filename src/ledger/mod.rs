// Ledger module - THE TWO CHAINS
// In-memory chain simulation (accounts, fees, transaction history) and the
// interfaces the bridge core consumes from it

mod account;
mod chain;
mod history;
mod traits;

pub use account::AccountRoot;
pub use chain::{BalanceChanges, Chain, ChainConfig, LedgerError};
pub use history::{ChainHistory, Commitment, TxKind, TxRecord};
pub use traits::{AccountState, SourceChain};

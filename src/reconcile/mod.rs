// Reconcile module - BALANCE ORACLE
// Derives expected balance movements from the bridge event log and checks chains against them

mod balances;
mod events;

pub use balances::{BalanceAssertions, BalanceSnapshot, ReconcileError, Reconciler};
pub use events::{BridgeEvent, EventLog};

// Settlement module - RELEASING FUNDS
// Exactly-once release of attested transfers and signature reward distribution

mod engine;
mod reward;

pub use engine::{
    ClaimRequest, Settlement, SettlementConfig, SettlementEngine, SettlementError,
    SettlementOutcome,
};
pub use reward::{split_reward, RemainderPolicy, RewardSplit};

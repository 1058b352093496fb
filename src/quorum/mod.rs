// Quorum module - WEIGHTED AGREEMENT
// Aggregates attestations per claim reference and decides when signer weight reaches quorum

mod evaluator;
mod tally;

pub use evaluator::{QuorumError, QuorumEvaluator, QuorumState, QuorumStatus, ReattestPolicy};
pub use tally::{tally, QuorumSet, Tally, Vote};

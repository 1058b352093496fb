// Error taxonomy shared by every bridge operation

use crate::claims::ClaimError;
use crate::identity::AccountId;
use crate::ledger::LedgerError;
use crate::quorum::QuorumError;
use crate::reconcile::ReconcileError;
use crate::registry::RegistryError;
use crate::settlement::SettlementError;
use crate::witness::WitnessError;
use thiserror::Error;

/// Broad class of a failure, used to decide how a caller should react
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad shape or values; resubmitting unchanged will fail again
    Malformed,
    /// Well-formed but refused by bridge or chain rules
    Policy,
    /// Names a bridge, account or reference that does not exist
    Referential,
    /// Not enough signer weight yet; may succeed after more attestations
    QuorumPending,
    /// Caller lacks the required authorization
    Permission,
    /// The reference is permanently closed
    Fatal,
}

impl ErrorClass {
    /// Whether the same request can succeed later without being changed
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::QuorumPending)
    }
}

/// Any error from the bridge network
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Attested sender {got} is not the claim's bound source {expected}")]
    SenderMismatch { expected: AccountId, got: AccountId },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Witness(#[from] WitnessError),

    #[error(transparent)]
    Quorum(#[from] QuorumError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl BridgeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::SenderMismatch { .. } => ErrorClass::Policy,
            BridgeError::Registry(e) => e.class(),
            BridgeError::Ledger(e) => e.class(),
            BridgeError::Claim(e) => e.class(),
            BridgeError::Witness(WitnessError::NotFound(_)) => ErrorClass::Referential,
            BridgeError::Witness(WitnessError::Stopped) => ErrorClass::Policy,
            BridgeError::Witness(_) => ErrorClass::Fatal,
            BridgeError::Quorum(e) => e.class(),
            BridgeError::Settlement(e) => e.class(),
            BridgeError::Reconcile(_) => ErrorClass::Fatal,
        }
    }
}

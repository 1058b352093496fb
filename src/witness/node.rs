// Witness Node - one independently-scheduled observer per configured signer

use crate::claims::ClaimRef;
use crate::identity::{AccountId, Keypair};
use crate::ledger::SourceChain;
use crate::registry::{Amount, BridgeKey};
use crate::witness::{Attestation, AttestationBody, CodecError, StoreError, WitnessStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from a witness
#[derive(Error, Debug)]
pub enum WitnessError {
    #[error("Witness is stopped")]
    Stopped,

    #[error("No matching commitment for {0}")]
    NotFound(ClaimRef),

    #[error("Witness storage: {0}")]
    Store(#[from] StoreError),

    #[error("Witness storage I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attestation encoding: {0}")]
    Codec(#[from] CodecError),
}

/// Configuration for a witness node
#[derive(Clone, Debug, Default)]
pub struct WitnessConfig {
    /// Label used in logs
    pub name: String,
    /// Location of the local sled database; `None` runs without one
    pub db_path: Option<PathBuf>,
}

impl WitnessConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            db_path: None,
        }
    }

    pub fn with_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.db_path = Some(path.into());
        self
    }
}

/// What a caller asks a witness to confirm
#[derive(Clone, Debug)]
pub struct AttestationRequest {
    pub bridge: BridgeKey,
    pub reference: ClaimRef,
    pub expected_sender: AccountId,
    pub expected_amount: Amount,
}

impl AttestationRequest {
    pub fn new(
        bridge: BridgeKey,
        reference: ClaimRef,
        expected_sender: AccountId,
        expected_amount: Amount,
    ) -> Self {
        Self {
            bridge,
            reference,
            expected_sender,
            expected_amount,
        }
    }
}

/// A witness: signing key, reward account, and an optional local database.
///
/// Attestations are a pure function of source-chain history; the local
/// database only logs what was issued.
pub struct WitnessNode {
    config: WitnessConfig,
    keypair: Keypair,
    account: AccountId,
    reward_account: AccountId,
    running: AtomicBool,
    store: Mutex<Option<WitnessStore>>,
}

impl WitnessNode {
    /// Create and start a witness
    pub fn new(
        config: WitnessConfig,
        keypair: Keypair,
        reward_account: AccountId,
    ) -> Result<Self, WitnessError> {
        let account = AccountId::from_public_key(&keypair.public_key());
        let node = Self {
            config,
            keypair,
            account,
            reward_account,
            running: AtomicBool::new(false),
            store: Mutex::new(None),
        };
        node.start()?;
        Ok(node)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Signer account this witness attests as
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn reward_account(&self) -> &AccountId {
        &self.reward_account
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start (or restart) the witness, opening its database if configured
    pub fn start(&self) -> Result<(), WitnessError> {
        if self.is_running() {
            return Ok(());
        }
        if let Some(path) = &self.config.db_path {
            let store = WitnessStore::open(path)?;
            *self.lock_store() = Some(store);
        }
        self.running.store(true, Ordering::SeqCst);
        info!(witness = %self.config.name, account = %self.account, "witness started");
        Ok(())
    }

    /// Stop the witness; it refuses to attest until started again
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(store) = self.lock_store().take() {
            if let Err(e) = store.flush() {
                warn!(witness = %self.config.name, error = %e, "flush on stop failed");
            }
        }
        info!(witness = %self.config.name, "witness stopped");
    }

    /// Stop the witness and remove its local database
    pub fn delete_database(&self) -> Result<(), WitnessError> {
        if self.is_running() {
            self.stop();
        }
        if let Some(path) = &self.config.db_path {
            if path.exists() {
                std::fs::remove_dir_all(path)?;
            }
            info!(witness = %self.config.name, path = %path.display(), "witness database deleted");
        }
        Ok(())
    }

    /// Number of attestations in the local log (0 without a database)
    pub fn logged_attestations(&self) -> usize {
        self.lock_store().as_ref().map(|s| s.len()).unwrap_or(0)
    }

    /// Scan `source` for the latest commitment against `request.reference`
    /// and sign it if door, asset, sender and amount all match exactly.
    pub fn attest(
        &self,
        source: &dyn SourceChain,
        request: &AttestationRequest,
    ) -> Result<Attestation, WitnessError> {
        if !self.is_running() {
            return Err(WitnessError::Stopped);
        }

        let commitment = source
            .latest_commitment(&request.bridge, request.reference)
            .ok_or(WitnessError::NotFound(request.reference))?;

        let side = source.side();
        let matches = commitment.source == side
            && commitment.door() == request.bridge.door(side)
            && commitment.amount.asset() == request.bridge.asset(side)
            && commitment.sender == request.expected_sender
            && commitment.amount == request.expected_amount;
        if !matches {
            debug!(
                witness = %self.config.name,
                reference = %request.reference,
                committed = %commitment.amount,
                expected = %request.expected_amount,
                "commitment does not match request"
            );
            return Err(WitnessError::NotFound(request.reference));
        }

        let attestation =
            AttestationBody::from_commitment(&commitment, &self.keypair, self.reward_account)
                .sign(&self.keypair)?;

        if let Some(store) = self.lock_store().as_ref() {
            if let Err(e) = store.record(&attestation) {
                warn!(witness = %self.config.name, error = %e, "failed to log attestation");
            }
        }

        debug!(witness = %self.config.name, claim = %attestation.key(), "attestation signed");
        Ok(attestation)
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, Option<WitnessStore>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

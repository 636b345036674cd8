//! Orchestration errors.

use dab_attest::AttestationError;
use dab_core::{CodecError, B256};
use dab_store::StoreError;
use thiserror::Error;

use crate::chain::{ChainError, IndexKind};

/// Errors from submission and retrieval.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Envelope, payload, message type, or batch encoding could not be
    /// decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The DA chain rejected or dropped the submission.
    #[error("DA chain submission failed: {0}")]
    ChainSubmissionFailed(#[source] ChainError),

    /// The bridge did not serve a proof within the retry budget.
    #[error("bridge proof for block {block_hash} index {index} not available after {attempts} attempts: {last}")]
    AttestationTimeout {
        block_hash: B256,
        index: u32,
        attempts: u32,
        last: String,
    },

    /// No attestation record exists for a leaf.
    #[error("no attestation found for leaf {leaf}: {reason}")]
    AttestationNotFound { leaf: B256, reason: String },

    /// The bridge served something that is not a proof.
    #[error("bridge proof response is malformed: {0}")]
    MalformedProof(String),

    /// No blob at the resolved coordinates, or the chain read failed.
    #[error("cannot retrieve blob at {kind} {index} of block {block_number}: {source}")]
    RetrievalFailed {
        block_number: u32,
        index: u128,
        kind: IndexKind,
        #[source]
        source: ChainError,
    },

    /// The fallback store was the only read path and failed.
    #[error("fallback store: {0}")]
    FallbackStore(#[source] StoreError),

    /// A collaborator needed by the operation is not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A collaborator could not be constructed from configuration.
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// The caller's cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<dab_core::Cancelled> for BackendError {
    fn from(_: dab_core::Cancelled) -> Self {
        BackendError::Cancelled
    }
}

impl From<AttestationError> for BackendError {
    fn from(err: AttestationError) -> Self {
        match err {
            AttestationError::Timeout {
                block_hash,
                index,
                attempts,
                last,
            } => BackendError::AttestationTimeout {
                block_hash,
                index,
                attempts,
                last,
            },
            AttestationError::NotFound { leaf, reason } => {
                BackendError::AttestationNotFound { leaf, reason }
            }
            AttestationError::MalformedProof(msg) => BackendError::MalformedProof(msg),
            AttestationError::Config(msg) => BackendError::Config(msg),
            AttestationError::Cancelled => BackendError::Cancelled,
        }
    }
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => BackendError::Cancelled,
            other => BackendError::FallbackStore(other),
        }
    }
}

impl BackendError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled)
    }
}

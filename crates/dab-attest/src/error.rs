//! Error types for attestation resolution and JSON-RPC transport.

use dab_core::B256;
use thiserror::Error;

/// Failures of a single JSON-RPC exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonRpcError {
    /// Connection failure, timeout, or other transport error.
    #[error("transport error calling {method}: {message}")]
    Transport { method: String, message: String },

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status} calling {method}")]
    Http { method: String, status: u16 },

    /// The response was not a JSON-RPC envelope or its result had the wrong
    /// shape.
    #[error("invalid response to {method}: {message}")]
    InvalidResponse { method: String, message: String },

    /// The remote returned a JSON-RPC `error` object.
    #[error("{method} failed with code {code}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },
}

/// Errors from bridge proof acquisition and attestation reads.
#[derive(Error, Debug)]
pub enum AttestationError {
    /// The bridge did not serve a proof within the retry budget.
    #[error("bridge proof for block {block_hash} index {index} not available after {attempts} attempts: {last}")]
    Timeout {
        block_hash: B256,
        index: u32,
        attempts: u32,
        last: String,
    },

    /// The bridge answered 200 with a body that is not a proof.
    #[error("bridge proof response is malformed: {0}")]
    MalformedProof(String),

    /// No attestation record exists for the leaf, or it could not be read.
    #[error("no attestation found for leaf {leaf}: {reason}")]
    NotFound { leaf: B256, reason: String },

    /// Invalid client configuration (URL, contract address).
    #[error("invalid attestation configuration: {0}")]
    Config(String),

    /// The caller's cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,
}

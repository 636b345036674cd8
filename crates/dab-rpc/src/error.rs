//! # JSON-RPC Error Objects
//!
//! Every failure reaches the caller as a single `{code, message}` object.
//! Backend error chains are collapsed into the message string.

use dab_backend::BackendError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
/// Server-defined: the requested data could not be retrieved.
pub const LOOKUP_FAILED: i64 = -32000;

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

/// Request-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The body is not JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The body is JSON but not a request object.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The backend could not produce the data.
    #[error("failed to retrieve the data from off-chain DA: {0}")]
    Lookup(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse(_) => PARSE_ERROR,
            RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => INVALID_PARAMS,
            RpcError::Lookup(_) => LOOKUP_FAILED,
        }
    }

    pub fn to_object(&self) -> ErrorObject {
        ErrorObject {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<BackendError> for RpcError {
    fn from(err: BackendError) -> Self {
        RpcError::Lookup(err.to_string())
    }
}

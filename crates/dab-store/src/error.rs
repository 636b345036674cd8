//! Error types for the fallback content store.

use std::fmt;

use thiserror::Error;

/// Errors from object-store backends and the fallback store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No object exists under the key.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The stored bytes do not hash to the key they were stored under.
    #[error("object {key} is corrupt: content does not match its hash")]
    Corrupt { key: String },

    /// The key cannot be mapped onto the backend (e.g. path traversal on the
    /// filesystem backend).
    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Filesystem I/O failure.
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote backend failure (S3 service or transport error).
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// A pool worker panicked or was aborted before reporting.
    #[error("store worker failed: {0}")]
    Worker(String),

    /// One or more items of a multi-item operation failed.
    #[error(transparent)]
    Partial(#[from] AggregateError),

    /// The caller's cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<dab_core::Cancelled> for StoreError {
    fn from(_: dab_core::Cancelled) -> Self {
        StoreError::Cancelled
    }
}

/// The failure of one item in a multi-item operation.
#[derive(Debug)]
pub struct ItemFailure {
    /// Position of the item in the input.
    pub index: usize,
    /// Object key of the item.
    pub key: String,
    pub error: StoreError,
}

/// Every per-item failure of a multi-item operation, in input order.
#[derive(Debug, Default)]
pub struct AggregateError {
    /// Number of items in the operation.
    pub total: usize,
    pub failures: Vec<ItemFailure>,
}

impl AggregateError {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Indices of the failed items.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} store operations failed",
            self.failures.len(),
            self.total
        )?;
        for (n, failure) in self.failures.iter().enumerate() {
            let sep = if n == 0 { ": " } else { "; " };
            write!(f, "{sep}[{}] {}: {}", failure.index, failure.key, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_lists_every_failure() {
        let agg = AggregateError {
            total: 4,
            failures: vec![
                ItemFailure {
                    index: 1,
                    key: "p/aa".into(),
                    error: StoreError::NotFound { key: "p/aa".into() },
                },
                ItemFailure {
                    index: 3,
                    key: "p/bb".into(),
                    error: StoreError::Worker("panicked".into()),
                },
            ],
        };
        let msg = StoreError::from(agg).to_string();
        assert!(msg.starts_with("2 of 4 store operations failed"));
        assert!(msg.contains("[1] p/aa: object not found"));
        assert!(msg.contains("[3] p/bb: store worker failed: panicked"));
    }
}

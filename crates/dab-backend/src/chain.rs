//! # DA Chain Seam
//!
//! [`DaChain`] is the narrow interface the orchestrators need from the
//! primary DA chain: submit a blob and wait for finalized inclusion, and read
//! a blob back by block and position. Chain clients are blocking and not
//! natively cancellable, so the trait is synchronous; [`run_blocking`] moves
//! a call onto the blocking pool and races it against the caller's
//! cancellation.
//!
//! ## Cancellation Caveat
//!
//! A cancelled call is abandoned, not killed. The worker thread keeps
//! running until the chain client returns, and a submission may still land
//! on chain after the caller has seen `Cancelled`.
//!
//! ## Positions
//!
//! A blob's position is either its extrinsic index within the block
//! ([`IndexKind::ByExtrinsicIndex`], used by blob pointers) or its index
//! among the block's data submissions ([`IndexKind::ByLeafIndex`], the leaf
//! index recorded by the attestation contract).

use std::fmt;

use dab_core::{keccak256, Cancellation, Cancelled, B256};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

/// How a blob's position within a block is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Position among all extrinsics of the block.
    ByExtrinsicIndex,
    /// Position among the block's data submissions only.
    ByLeafIndex,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::ByExtrinsicIndex => f.write_str("extrinsic index"),
            IndexKind::ByLeafIndex => f.write_str("leaf index"),
        }
    }
}

/// Where a submitted blob was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionDetails {
    pub block_number: u32,
    pub block_hash: B256,
    /// Extrinsic index of the submission within the block.
    pub tx_index: u32,
}

/// Errors reported by a chain client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The chain rejected or dropped the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The chain could not be reached.
    #[error("chain unavailable: {0}")]
    Unavailable(String),

    /// The block exists but holds no blob at the position.
    #[error("no blob at {kind} {index} in block {block_number}")]
    NoBlob {
        block_number: u32,
        index: u128,
        kind: IndexKind,
    },

    /// The block is not known to the chain.
    #[error("unknown block {0}")]
    UnknownBlock(u32),

    /// The blocking worker panicked.
    #[error("chain worker failed: {0}")]
    Worker(String),
}

/// Blocking client of the primary DA chain.
pub trait DaChain: Send + Sync + fmt::Debug + 'static {
    /// Submit `blob` and block until its inclusion is finalized.
    fn submit_and_finalize(&self, blob: &[u8]) -> Result<InclusionDetails, ChainError>;

    /// Read the blob at `(block_number, index)`, counting positions by `kind`.
    fn fetch_blob(
        &self,
        block_number: u32,
        index: u32,
        kind: IndexKind,
    ) -> Result<Vec<u8>, ChainError>;
}

/// Run a blocking chain call on the blocking pool, racing `cancel`.
///
/// The outer `Result` reports cancellation; the inner one is the call's own
/// outcome. On cancellation the worker is abandoned.
pub async fn run_blocking<T, F>(
    cancel: &Cancellation,
    call: F,
) -> Result<Result<T, ChainError>, Cancelled>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ChainError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(call);
    match cancel.run(handle).await? {
        Ok(outcome) => Ok(outcome),
        Err(join) => Ok(Err(ChainError::Worker(join.to_string()))),
    }
}

#[derive(Debug, Clone)]
struct MemoryBlock {
    hash: B256,
    /// Extrinsic 0 is the block's inherent; data submissions follow.
    submissions: Vec<Vec<u8>>,
}

/// Leading non-data extrinsics in every [`MemoryChain`] block.
pub const MEMORY_CHAIN_INHERENTS: u32 = 1;

/// In-process [`DaChain`] for development and tests.
///
/// Every submission is finalized immediately in a new block of its own,
/// after one inherent extrinsic, so a blob sits at extrinsic index
/// [`MEMORY_CHAIN_INHERENTS`] and leaf index 0. Block numbers start at 1.
#[derive(Debug, Default)]
pub struct MemoryChain {
    blocks: Mutex<Vec<MemoryBlock>>,
    reject_reason: Mutex<Option<String>>,
    latency: Mutex<Option<std::time::Duration>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every later submission with `reason`.
    pub fn reject_submissions(&self, reason: impl Into<String>) {
        *self.reject_reason.lock() = Some(reason.into());
    }

    /// Delay every call by `latency`, blocking the calling thread.
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Number of finalized blocks.
    pub fn height(&self) -> u32 {
        self.blocks.lock().len() as u32
    }

    /// Append `blobs` as data submissions of one new block and return its
    /// number.
    pub fn push_block(&self, blobs: Vec<Vec<u8>>) -> u32 {
        let mut blocks = self.blocks.lock();
        let number = blocks.len() as u32 + 1;
        let mut preimage = number.to_be_bytes().to_vec();
        for blob in &blobs {
            preimage.extend_from_slice(keccak256(blob).as_slice());
        }
        blocks.push(MemoryBlock {
            hash: keccak256(&preimage),
            submissions: blobs,
        });
        number
    }

    fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
    }
}

impl DaChain for MemoryChain {
    fn submit_and_finalize(&self, blob: &[u8]) -> Result<InclusionDetails, ChainError> {
        self.simulate_latency();
        if let Some(reason) = self.reject_reason.lock().clone() {
            return Err(ChainError::Rejected(reason));
        }
        let block_number = self.push_block(vec![blob.to_vec()]);
        let block_hash = self.blocks.lock()[block_number as usize - 1].hash;
        Ok(InclusionDetails {
            block_number,
            block_hash,
            tx_index: MEMORY_CHAIN_INHERENTS,
        })
    }

    fn fetch_blob(
        &self,
        block_number: u32,
        index: u32,
        kind: IndexKind,
    ) -> Result<Vec<u8>, ChainError> {
        self.simulate_latency();
        let blocks = self.blocks.lock();
        let block = block_number
            .checked_sub(1)
            .and_then(|i| blocks.get(i as usize))
            .ok_or(ChainError::UnknownBlock(block_number))?;
        let position = match kind {
            IndexKind::ByLeafIndex => Some(index),
            IndexKind::ByExtrinsicIndex => index.checked_sub(MEMORY_CHAIN_INHERENTS),
        };
        position
            .and_then(|p| block.submissions.get(p as usize))
            .cloned()
            .ok_or(ChainError::NoBlob {
                block_number,
                index: u128::from(index),
                kind,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn memory_chain_positions() {
        let chain = MemoryChain::new();
        let details = chain.submit_and_finalize(b"blob").unwrap();
        assert_eq!(details.block_number, 1);
        assert_eq!(details.tx_index, MEMORY_CHAIN_INHERENTS);

        let by_tx = chain
            .fetch_blob(1, details.tx_index, IndexKind::ByExtrinsicIndex)
            .unwrap();
        let by_leaf = chain.fetch_blob(1, 0, IndexKind::ByLeafIndex).unwrap();
        assert_eq!(by_tx, b"blob");
        assert_eq!(by_leaf, b"blob");

        assert!(matches!(
            chain.fetch_blob(1, 0, IndexKind::ByExtrinsicIndex),
            Err(ChainError::NoBlob { .. })
        ));
        assert_eq!(
            chain.fetch_blob(9, 0, IndexKind::ByLeafIndex),
            Err(ChainError::UnknownBlock(9))
        );
        assert_eq!(
            chain.fetch_blob(0, 0, IndexKind::ByLeafIndex),
            Err(ChainError::UnknownBlock(0))
        );
    }

    #[test]
    fn block_hashes_differ() {
        let chain = MemoryChain::new();
        let a = chain.submit_and_finalize(b"same").unwrap();
        let b = chain.submit_and_finalize(b"same").unwrap();
        assert_ne!(a.block_hash, b.block_hash);
        assert_eq!(chain.height(), 2);
    }

    #[test]
    fn rejection() {
        let chain = MemoryChain::new();
        chain.reject_submissions("insufficient balance");
        assert_eq!(
            chain.submit_and_finalize(b"x"),
            Err(ChainError::Rejected("insufficient balance".into()))
        );
        assert_eq!(chain.height(), 0);
    }

    #[tokio::test]
    async fn run_blocking_returns_call_outcome() {
        let chain = Arc::new(MemoryChain::new());
        let c = Arc::clone(&chain);
        let out = run_blocking(&Cancellation::never(), move || c.submit_and_finalize(b"x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.block_number, 1);
    }

    #[tokio::test]
    async fn run_blocking_abandons_on_cancel() {
        let chain = Arc::new(MemoryChain::new());
        chain.set_latency(Duration::from_millis(300));
        let (handle, token) = dab_core::cancellation();
        handle.cancel();

        let c = Arc::clone(&chain);
        let out = run_blocking(&token, move || c.submit_and_finalize(b"late")).await;
        assert!(out.is_err());

        // The abandoned worker still finishes in the background.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(chain.height(), 1);
    }

    #[tokio::test]
    async fn run_blocking_reports_panics() {
        let out: Result<Result<(), ChainError>, Cancelled> =
            run_blocking(&Cancellation::never(), || panic!("boom")).await;
        assert!(matches!(out, Ok(Err(ChainError::Worker(_)))));
    }
}

//! # Content-Addressed Fallback Store
//!
//! Mirrors batch payloads into an [`ObjectStore`] so they can be served
//! without touching the DA chain. Every object is keyed by
//! `object_prefix + hex(keccak256(item))`: lowercase hex, no `0x`.
//!
//! ## Multi-Item Operations
//!
//! [`FallbackStore::put_multiple`] and [`FallbackStore::get_multiple_by_hash`]
//! fan out through the bounded worker pool. Items succeed or fail
//! independently. The returned [`PartialResult`] holds one slot per input
//! (in input order) plus an [`AggregateError`] naming every failed item; the
//! outer `Err` is reserved for cancellation.
//!
//! Reads check the body against its key: an object whose keccak-256 differs
//! from the requested hash fails with [`StoreError::Corrupt`].

use std::sync::Arc;
use std::time::SystemTime;

use dab_core::{keccak256, Cancellation, Cancelled, B256};

use crate::backend::ObjectStore;
use crate::config::FallbackConfig;
use crate::error::{AggregateError, ItemFailure, StoreError};
use crate::pool::run_bounded;

/// Index-aligned outcome of a multi-item operation.
#[derive(Debug)]
pub struct PartialResult<T> {
    /// One slot per input item; `None` where the item failed.
    pub values: Vec<Option<T>>,
    /// Every failure, in input order.
    pub errors: AggregateError,
}

impl<T> PartialResult<T> {
    /// Whether every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// All values if every item succeeded, else the aggregate error.
    pub fn into_result(self) -> Result<Vec<T>, StoreError> {
        if !self.errors.is_empty() {
            return Err(StoreError::Partial(self.errors));
        }
        self.values
            .into_iter()
            .enumerate()
            .map(|(index, v)| {
                v.ok_or_else(|| StoreError::Worker(format!("item {index} produced no value")))
            })
            .collect()
    }

    fn collect(keys: Vec<String>, outcomes: Vec<Result<T, StoreError>>) -> Self {
        let total = outcomes.len();
        let mut values = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (index, (key, outcome)) in keys.into_iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(v) => values.push(Some(v)),
                Err(error) => {
                    values.push(None);
                    failures.push(ItemFailure { index, key, error });
                }
            }
        }
        Self {
            values,
            errors: AggregateError { total, failures },
        }
    }
}

/// Content-addressed store over a pluggable backend.
#[derive(Debug, Clone)]
pub struct FallbackStore {
    backend: Arc<dyn ObjectStore>,
    config: FallbackConfig,
}

impl FallbackStore {
    pub fn new(backend: Arc<dyn ObjectStore>, config: FallbackConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<dyn ObjectStore> {
        &self.backend
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Object key for a content hash.
    pub fn object_key(&self, hash: &B256) -> String {
        format!("{}{}", self.config.object_prefix, hex::encode(hash))
    }

    /// Store `value` under `commitment`.
    ///
    /// `timeout` is forwarded as the object expiry only when the store is
    /// configured with `discard_after_timeout`.
    pub async fn put(
        &self,
        value: Vec<u8>,
        commitment: B256,
        timeout: Option<SystemTime>,
    ) -> Result<(), StoreError> {
        let key = self.object_key(&commitment);
        let expires = timeout.filter(|_| self.config.discard_after_timeout);
        tracing::trace!(key = %key, size = value.len(), "fallback store put");
        self.backend.put_object(&key, value, expires).await
    }

    /// Store every item under the keccak-256 of its bytes.
    pub async fn put_multiple(
        &self,
        values: Vec<Vec<u8>>,
        cancel: &Cancellation,
    ) -> Result<PartialResult<B256>, Cancelled> {
        let hashes: Vec<B256> = values.iter().map(|v| keccak256(v)).collect();
        let keys: Vec<String> = hashes.iter().map(|h| self.object_key(h)).collect();
        let jobs: Vec<(String, B256, Vec<u8>)> = keys
            .iter()
            .cloned()
            .zip(hashes)
            .zip(values)
            .map(|((k, h), v)| (k, h, v))
            .collect();

        let backend = Arc::clone(&self.backend);
        let outcomes = run_bounded(
            jobs,
            self.config.effective_concurrency(),
            cancel,
            move |(key, hash, value)| {
                let backend = Arc::clone(&backend);
                async move {
                    backend.put_object(&key, value, None).await?;
                    Ok(hash)
                }
            },
        )
        .await?;

        let result = PartialResult::collect(keys, outcomes);
        if !result.is_complete() {
            tracing::debug!(
                failed = result.errors.failures.len(),
                total = result.errors.total,
                "fallback store put_multiple incomplete"
            );
        }
        Ok(result)
    }

    /// Fetch the object stored under `hash`.
    pub async fn get_by_hash(&self, hash: &B256) -> Result<Vec<u8>, StoreError> {
        let key = self.object_key(hash);
        tracing::trace!(key = %key, "fallback store get");
        let body = self.backend.get_object(&key).await?;
        verify_content(key, hash, body)
    }

    /// Fetch every hash. Slot `i` holds the object for `hashes[i]`.
    pub async fn get_multiple_by_hash(
        &self,
        hashes: &[B256],
        cancel: &Cancellation,
    ) -> Result<PartialResult<Vec<u8>>, Cancelled> {
        let keys: Vec<String> = hashes.iter().map(|h| self.object_key(h)).collect();
        let jobs: Vec<(String, B256)> = keys.iter().cloned().zip(hashes.iter().copied()).collect();
        let backend = Arc::clone(&self.backend);
        let outcomes = run_bounded(
            jobs,
            self.config.effective_concurrency(),
            cancel,
            move |(key, hash)| {
                let backend = Arc::clone(&backend);
                async move {
                    let body = backend.get_object(&key).await?;
                    verify_content(key, &hash, body)
                }
            },
        )
        .await?;
        Ok(PartialResult::collect(keys, outcomes))
    }

    /// Backend health.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.backend.health_check().await
    }
}

fn verify_content(key: String, hash: &B256, body: Vec<u8>) -> Result<Vec<u8>, StoreError> {
    if keccak256(&body) != *hash {
        tracing::warn!(key = %key, size = body.len(), "fallback object does not match its hash");
        return Err(StoreError::Corrupt { key });
    }
    Ok(body)
}

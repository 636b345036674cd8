//! The object-store seam.
//!
//! [`ObjectStore`] is the narrow interface the fallback store drives. A
//! backend stores opaque bodies under string keys; it knows nothing about
//! hashing or key derivation.

use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::StoreError;

/// A key/value blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Store `body` under `key`. `expires` asks the backend to discard the
    /// object after the given instant, where supported.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        expires: Option<SystemTime>,
    ) -> Result<(), StoreError>;

    /// Fetch the body stored under `key`. A missing key is
    /// [`StoreError::NotFound`].
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Verify the backend is reachable and usable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

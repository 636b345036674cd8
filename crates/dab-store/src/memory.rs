//! In-memory object store for development and tests.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::backend::ObjectStore;
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    expires: Option<SystemTime>,
}

/// A `HashMap`-backed [`ObjectStore`].
///
/// Expiry is recorded but not enforced; [`MemoryObjectStore::expires_at`]
/// exposes it for inspection.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The expiry recorded for `key`, if the object exists and has one.
    pub fn expires_at(&self, key: &str) -> Option<SystemTime> {
        self.objects.read().get(key).and_then(|o| o.expires)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        expires: Option<SystemTime>,
    ) -> Result<(), StoreError> {
        self.objects
            .write()
            .insert(key.to_string(), StoredObject { body, expires });
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn put_get_and_missing() {
        let store = MemoryObjectStore::new();
        store.put_object("a", b"one".to_vec(), None).await.unwrap();
        assert_eq!(store.get_object("a").await.unwrap(), b"one");
        assert!(matches!(
            store.get_object("b").await,
            Err(StoreError::NotFound { key }) if key == "b"
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn records_expiry() {
        let store = MemoryObjectStore::new();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        store.put_object("k", vec![1], Some(at)).await.unwrap();
        assert_eq!(store.expires_at("k"), Some(at));
    }
}

//! # Filesystem Object Store
//!
//! Stores each object as a file at `{root}/{key}`. Keys may contain `/` to
//! form sub-directories (object prefixes such as `batches/` map onto
//! directories), but must be relative and free of `.`/`..` components.
//!
//! ## Atomic Writes
//!
//! A put writes the body to a sibling temp file, syncs it and renames it over
//! `{root}/{key}`. Readers see either the previous object or the complete new
//! one, never a partial write. A second put of the same key replaces the
//! object, which also repairs a file left corrupt by an earlier crash.
//!
//! Expiry is not supported and is ignored.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::backend::ObjectStore;
use crate::error::StoreError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique sibling of `path` for staging a write.
fn temp_path(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".tmp.{}.{n}", std::process::id()));
    path.with_file_name(name)
}

/// A directory-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key onto a path under the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if key.is_empty() {
            return Err(invalid("empty key"));
        }
        let rel = Path::new(key);
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(invalid("key must be a relative path without . or ..")),
            }
        }
        if key.ends_with('/') {
            return Err(invalid("key must name a file"));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        expires: Option<SystemTime>,
    ) -> Result<(), StoreError> {
        if expires.is_some() {
            tracing::debug!(key, "filesystem store ignores object expiry");
        }
        let path = self.path_for(key)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp = temp_path(&path);
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            key: self.root.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.root).await.map_err(io_err)?;
        let meta = tokio::fs::metadata(&self.root).await.map_err(io_err)?;
        if meta.permissions().readonly() {
            return Err(StoreError::Backend {
                backend: "filesystem",
                message: format!("{} is read-only", self.root.display()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_absolute_keys() {
        let store = FsObjectStore::new("/tmp/dab");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("/etc/passwd").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for("dir/").is_err());
        assert_eq!(
            store.path_for("batches/abcd").unwrap(),
            PathBuf::from("/tmp/dab/batches/abcd")
        );
    }

    #[tokio::test]
    async fn put_replaces_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.put_object("p/k", b"first".to_vec(), None).await.unwrap();
        store.put_object("p/k", b"second".to_vec(), None).await.unwrap();
        assert_eq!(store.get_object("p/k").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn put_overwrites_truncated_file_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("p")).unwrap();
        std::fs::write(dir.path().join("p/k"), b"hel").unwrap();

        store.put_object("p/k", b"hello-data".to_vec(), None).await.unwrap();

        assert_eq!(store.get_object("p/k").await.unwrap(), b"hello-data");
        let names: Vec<_> = std::fs::read_dir(dir.path().join("p"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("k")]);
    }

    #[test]
    fn temp_paths_are_unique_siblings() {
        let path = Path::new("/tmp/dab/p/k");
        let (a, b) = (temp_path(path), temp_path(path));
        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("k.tmp."));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(matches!(
            store.get_object("nope").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn health_check_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/store");
        let store = FsObjectStore::new(&root);
        store.health_check().await.unwrap();
        assert!(root.is_dir());
    }
}

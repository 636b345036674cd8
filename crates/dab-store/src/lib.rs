//! # dab-store: Fallback Content Store
//!
//! A content-addressed mirror of batch payloads, used to serve retrievals
//! without the DA chain and to survive chain-side outages.
//!
//! - [`ObjectStore`]: the backend seam. Implementations: [`MemoryObjectStore`],
//!   [`FsObjectStore`], and `S3ObjectStore` (feature `s3`).
//! - [`FallbackStore`]: keys objects by `prefix + hex(keccak256(item))` and
//!   runs multi-item operations through the bounded worker pool
//!   ([`pool::run_bounded`]), returning index-aligned [`PartialResult`]s.
//! - [`S3Config`] / [`FallbackConfig`]: deserializable settings with
//!   redacted credentials.

pub mod backend;
pub mod config;
pub mod error;
pub mod fallback;
pub mod fs;
pub mod memory;
pub mod pool;
#[cfg(feature = "s3")]
pub mod s3;

pub use backend::ObjectStore;
pub use config::{FallbackConfig, S3Config, SecretString, DEFAULT_CONCURRENCY};
pub use error::{AggregateError, ItemFailure, StoreError};
pub use fallback::{FallbackStore, PartialResult};
pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

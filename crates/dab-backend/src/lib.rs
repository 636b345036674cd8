//! # dab-backend: DA Bridge Orchestration
//!
//! [`DaBackend`] implements the two pipelines of the DA bridge on top of the
//! lower crates:
//!
//! - **Submission**: batches go to the DA chain as one RLP blob and come
//!   back as an envelope holding a blob pointer or a bridge Merkle proof.
//!   The batches are mirrored into the fallback store on a best-effort
//!   basis.
//! - **Retrieval**: the fallback store short-circuits the chain when every
//!   requested batch is stored; otherwise the envelope is resolved to chain
//!   coordinates and the blob is read back.
//!
//! The DA chain itself sits behind the blocking [`DaChain`] trait.
//! [`MemoryChain`] implements it in process.

pub mod backend;
pub mod chain;
pub mod config;
pub mod error;

pub use backend::{BlobLocation, DaBackend};
pub use chain::{run_blocking, ChainError, DaChain, InclusionDetails, IndexKind, MemoryChain};
pub use config::{BackendConfig, BridgeSettings, ConfigError};
pub use error::BackendError;

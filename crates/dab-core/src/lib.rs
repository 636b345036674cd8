//! # dab-core: DA Bridge Wire Types and Primitives
//!
//! Leaf crate of the DA bridge workspace. Everything here is free of I/O
//! except the async retry executor:
//!
//! - **Hashes**: [`B256`] keccak-256 commitments and the [`U256`] integer
//!   used by Merkle proof indices, re-exported from `alloy-primitives`.
//! - **ABI words** ([`abi`]): a 32-byte-word writer and a bounds-checked
//!   reader over a byte cursor. All pointer payloads are laid out in this
//!   format so they can be forwarded unchanged to the attestation contract.
//! - **Codec** ([`codec`]): the tagged [`Envelope`], the [`BlobPointer`]
//!   and [`MerkleProofInput`] pointer variants, and the [`DaMessage`]
//!   dispatch over them.
//! - **Batches** ([`batch`]): the reversible RLP list encoding used to
//!   submit a sequence of batches to the DA chain as one blob.
//! - **Retry** ([`retry`]): bounded sequential retry with exponential
//!   backoff and jitter.
//! - **Cancellation** ([`cancel`]): the caller-supplied cancellation signal
//!   every suspension point in the workspace races against.
//!
//! ## Crate Policy
//!
//! - Codecs are explicit fixed-field-order functions; no runtime type
//!   inspection drives encoding.
//! - Decoders never panic on hostile input: every read is bounds-checked and
//!   reports [`CodecError`].

pub mod abi;
pub mod batch;
pub mod cancel;
pub mod codec;
pub mod error;
pub mod retry;

pub use alloy_primitives::{keccak256, B256, U256};
pub use batch::{decode_batches, encode_batches};
pub use cancel::{cancellation, CancelHandle, Cancellation, Cancelled};
pub use codec::{
    decode_envelope, encode_envelope, BlobPointer, DaMessage, Envelope, MerkleProofInput,
    MessageKind, BLOB_POINTER_VERSION,
};
pub use error::{AbiError, CodecError};
pub use retry::{run_with_retry, run_with_retry_if, Backoff, RetryError, RetryPolicy};

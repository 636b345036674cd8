//! # Codec Error Types
//!
//! Structured errors for envelope, pointer, and batch decoding, built with
//! `thiserror`. Decode errors are structural and never retried by callers.

use thiserror::Error;

/// Low-level failures while reading 32-byte ABI words.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// The input ended before the requested word range.
    #[error("input truncated: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        /// Byte offset of the read.
        offset: usize,
        /// Bytes required from `offset`.
        needed: usize,
        /// Total input length.
        available: usize,
    },

    /// A narrow integer word carried non-zero high-order bytes.
    #[error("word at offset {offset} does not fit in {bits} bits")]
    Overflow {
        /// Byte offset of the word.
        offset: usize,
        /// Width of the declared integer type.
        bits: u32,
    },

    /// A dynamic-data offset or length points outside the input.
    #[error("offset or length {value} at {offset} is out of range")]
    OutOfRange {
        /// Byte offset of the offending word.
        offset: usize,
        /// The decoded offset/length value, saturated to `usize`.
        value: usize,
    },

    /// The input length is not what the fixed layout requires.
    #[error("expected {expected} bytes, got {actual}")]
    Length {
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

/// Errors from encoding or decoding DA bridge wire types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The envelope framing itself is invalid (empty input, bad offset or
    /// length of the dynamic payload).
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A pointer payload is truncated or malformed for its declared type.
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        /// Which payload was being decoded.
        kind: &'static str,
        /// The underlying word-level failure.
        source: AbiError,
    },

    /// The envelope tag is not one of the known message types.
    #[error("unknown data availability message type: {0:#04x}")]
    UnknownMessageType(u8),

    /// The chain blob is not a valid batch list encoding.
    #[error("malformed batch encoding: {0}")]
    MalformedBatchEncoding(String),
}

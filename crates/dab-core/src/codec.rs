//! # Data Availability Message Codec
//!
//! A data availability message is the opaque token returned to the caller
//! after a submission. It is an [`Envelope`] whose first byte names the
//! pointer variant and whose remainder is the ABI encoding of a single
//! `bytes` value holding the variant payload:
//!
//! ```text
//! byte 0        messageType (0x01 blob pointer, 0x02 merkle proof)
//! bytes 1..33   offset word, always 0x20
//! bytes 33..65  payload length
//! bytes 65..    payload, right-padded to a 32-byte boundary
//! ```
//!
//! ## Payloads
//!
//! - [`BlobPointer`]: four words `uint8 version | uint32 blockHeight |
//!   uint32 extrinsicIndex | bytes32 commitment`.
//! - [`MerkleProofInput`]: the ABI encoding of the proof tuple as a single
//!   dynamic argument, byte-identical to the argument list of the
//!   attestation contract's `attest` call.
//!
//! Decoding the envelope does not validate the tag. Dispatch goes through
//! [`Envelope::kind`] or [`DaMessage::decode`], which report
//! [`CodecError::UnknownMessageType`].

use serde::Serialize;

use crate::abi::{self, AbiReader, AbiWriter, WORD};
use crate::error::{AbiError, CodecError};
use alloy_primitives::{B256, U256};

/// The only blob pointer version encoders produce.
pub const BLOB_POINTER_VERSION: u8 = 0;

/// Encoded size of a [`BlobPointer`] payload.
pub const BLOB_POINTER_LEN: usize = 4 * WORD;

/// Known envelope tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MessageKind {
    /// Payload is a [`BlobPointer`].
    BlobPointer = 0x01,
    /// Payload is a [`MerkleProofInput`].
    MerkleProof = 0x02,
}

impl MessageKind {
    /// The wire tag.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(Self::BlobPointer),
            0x02 => Ok(Self::MerkleProof),
            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}

/// The tagged outer wrapper of a data availability message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw tag byte. Not validated until dispatch.
    pub message_type: u8,
    /// Variant payload, opaque until decoded by type.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Build an envelope with a raw tag.
    pub fn new(message_type: u8, payload: Vec<u8>) -> Self {
        Self {
            message_type,
            payload,
        }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let body = abi::encode_single_bytes(&self.payload);
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(self.message_type);
        out.extend_from_slice(&body);
        out
    }

    /// Parse wire bytes. Fails only on structural problems.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let (&message_type, rest) = data
            .split_first()
            .ok_or_else(|| CodecError::MalformedEnvelope("empty input".into()))?;
        let payload = abi::decode_single_bytes(rest)
            .map_err(|e| CodecError::MalformedEnvelope(e.to_string()))?;
        Ok(Self {
            message_type,
            payload,
        })
    }

    /// The validated tag.
    pub fn kind(&self) -> Result<MessageKind, CodecError> {
        MessageKind::try_from(self.message_type)
    }
}

/// Encode an envelope carrying `payload` under `kind`.
pub fn encode_envelope(kind: MessageKind, payload: &[u8]) -> Vec<u8> {
    Envelope::new(kind.as_u8(), payload.to_vec()).encode()
}

/// Decode an envelope without validating its tag.
pub fn decode_envelope(data: &[u8]) -> Result<Envelope, CodecError> {
    Envelope::decode(data)
}

/// Direct chain coordinates of a submitted blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobPointer {
    /// Format version. Reserved; always [`BLOB_POINTER_VERSION`] on encode.
    pub version: u8,
    /// DA chain block containing the submission.
    pub block_height: u32,
    /// Position of the submission in that block.
    pub extrinsic_index: u32,
    /// keccak-256 of the exact bytes submitted.
    pub commitment: B256,
}

impl BlobPointer {
    /// A version-0 pointer.
    pub fn new(block_height: u32, extrinsic_index: u32, commitment: B256) -> Self {
        Self {
            version: BLOB_POINTER_VERSION,
            block_height,
            extrinsic_index,
            commitment,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = AbiWriter::new();
        w.uint(u128::from(self.version))
            .uint(u128::from(self.block_height))
            .uint(u128::from(self.extrinsic_index))
            .b256(self.commitment);
        w.finish()
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        Self::read(data).map_err(|source| CodecError::MalformedPayload {
            kind: "blob pointer",
            source,
        })
    }

    fn read(data: &[u8]) -> Result<Self, AbiError> {
        if data.len() != BLOB_POINTER_LEN {
            return Err(AbiError::Length {
                expected: BLOB_POINTER_LEN,
                actual: data.len(),
            });
        }
        let r = AbiReader::new(data);
        Ok(Self {
            version: r.uint_at(0, 8)? as u8,
            block_height: r.uint_at(WORD, 32)? as u32,
            extrinsic_index: r.uint_at(2 * WORD, 32)? as u32,
            commitment: r.b256_at(3 * WORD)?,
        })
    }
}

/// Bridge inclusion proof, as accepted by the attestation contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProofInput {
    pub data_root_proof: Vec<B256>,
    pub leaf_proof: Vec<B256>,
    pub range_hash: B256,
    pub data_root_index: U256,
    pub blob_root: B256,
    pub bridge_root: B256,
    /// Leaf hash; the key of the attestation record.
    pub leaf: B256,
    pub leaf_index: U256,
}

/// Number of head words in the proof tuple.
const PROOF_HEAD_WORDS: usize = 8;

impl MerkleProofInput {
    /// ABI-encode as a single tuple argument.
    pub fn encode(&self) -> Vec<u8> {
        let head_len = PROOF_HEAD_WORDS * WORD;
        let data_root_proof_at = head_len;
        let leaf_proof_at = data_root_proof_at + WORD + self.data_root_proof.len() * WORD;

        let mut w = AbiWriter::new();
        w.uint(WORD as u128)
            .uint(data_root_proof_at as u128)
            .uint(leaf_proof_at as u128)
            .b256(self.range_hash)
            .u256(self.data_root_index)
            .b256(self.blob_root)
            .b256(self.bridge_root)
            .b256(self.leaf)
            .u256(self.leaf_index)
            .b256_array_tail(&self.data_root_proof)
            .b256_array_tail(&self.leaf_proof);
        w.finish()
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        Self::read(data).map_err(|source| CodecError::MalformedPayload {
            kind: "merkle proof",
            source,
        })
    }

    fn read(data: &[u8]) -> Result<Self, AbiError> {
        let outer = AbiReader::new(data);
        let tuple = outer.sub(outer.offset_at(0)?)?;
        let data_root_proof = tuple.b256_array_at(tuple.offset_at(0)?)?;
        let leaf_proof = tuple.b256_array_at(tuple.offset_at(WORD)?)?;
        Ok(Self {
            data_root_proof,
            leaf_proof,
            range_hash: tuple.b256_at(2 * WORD)?,
            data_root_index: tuple.u256_at(3 * WORD)?,
            blob_root: tuple.b256_at(4 * WORD)?,
            bridge_root: tuple.b256_at(5 * WORD)?,
            leaf: tuple.b256_at(6 * WORD)?,
            leaf_index: tuple.u256_at(7 * WORD)?,
        })
    }
}

/// A decoded data availability message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum DaMessage {
    BlobPointer(BlobPointer),
    MerkleProof(MerkleProofInput),
}

impl DaMessage {
    /// Decode envelope bytes and dispatch on the tag.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        Self::from_envelope(&Envelope::decode(data)?)
    }

    /// Dispatch an already-decoded envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, CodecError> {
        match envelope.kind()? {
            MessageKind::BlobPointer => {
                BlobPointer::decode(&envelope.payload).map(DaMessage::BlobPointer)
            }
            MessageKind::MerkleProof => {
                MerkleProofInput::decode(&envelope.payload).map(DaMessage::MerkleProof)
            }
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            DaMessage::BlobPointer(_) => MessageKind::BlobPointer,
            DaMessage::MerkleProof(_) => MessageKind::MerkleProof,
        }
    }

    /// Encode into envelope bytes.
    pub fn encode(&self) -> Vec<u8> {
        let payload = match self {
            DaMessage::BlobPointer(p) => p.encode(),
            DaMessage::MerkleProof(p) => p.encode(),
        };
        encode_envelope(self.kind(), &payload)
    }
}

//! # Attestation Contract Access
//!
//! The attestation contract records, for every bridged leaf, where the blob
//! sits on the DA chain:
//!
//! ```solidity
//! function attestations(bytes32 leaf) external view
//!     returns (uint32 blockNumber, uint128 leafIndex);
//! function attest(MerkleProofInput calldata input) external;
//! ```
//!
//! [`EvmAttestationReader`] performs the read with a single `eth_call`. A
//! record with `blockNumber == 0` is the contract's empty default and means
//! the leaf was never attested. [`attest_calldata`] builds the write
//! transaction input; submitting it is left to external tooling.

use std::collections::HashMap;

use async_trait::async_trait;
use dab_core::abi::{AbiReader, AbiWriter};
use dab_core::{keccak256, MerkleProofInput, B256};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::AttestationError;
use crate::rpc::{is_valid_eth_address, JsonRpcClient};

/// Canonical signature of the attestation read.
pub const ATTESTATIONS_SIGNATURE: &str = "attestations(bytes32)";
/// Canonical signature of the attestation write.
pub const ATTEST_SIGNATURE: &str =
    "attest((bytes32[],bytes32[],bytes32,uint256,bytes32,bytes32,bytes32,uint256))";

/// First four bytes of the keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest.0[..4]);
    out
}

/// On-chain coordinates of an attested leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    pub block_number: u32,
    pub leaf_index: u128,
}

impl AttestationRecord {
    /// Decode the `(uint32, uint128)` return data of `attestations`.
    pub fn decode(data: &[u8]) -> Result<Self, String> {
        let r = AbiReader::new(data);
        Ok(Self {
            block_number: r.uint_at(0, 32).map_err(|e| e.to_string())? as u32,
            leaf_index: r.uint_at(32, 128).map_err(|e| e.to_string())?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.block_number == 0
    }
}

/// Calldata for `attestations(leaf)`.
pub fn attestations_calldata(leaf: &B256) -> Vec<u8> {
    let mut data = selector(ATTESTATIONS_SIGNATURE).to_vec();
    let mut w = AbiWriter::new();
    w.b256(*leaf);
    data.extend_from_slice(&w.finish());
    data
}

/// Calldata for `attest(proof)`. The proof payload is already encoded as the
/// call's single tuple argument, so it is appended to the selector as is.
pub fn attest_calldata(proof: &MerkleProofInput) -> Vec<u8> {
    let mut data = selector(ATTEST_SIGNATURE).to_vec();
    data.extend_from_slice(&proof.encode());
    data
}

/// Resolves a leaf to its attestation record.
#[async_trait]
pub trait AttestationReader: Send + Sync + std::fmt::Debug {
    /// The record for `leaf`, or [`AttestationError::NotFound`] when the leaf
    /// is unattested or the contract cannot be read.
    async fn attestation(&self, leaf: B256) -> Result<AttestationRecord, AttestationError>;
}

/// Reads the attestation contract over Ethereum JSON-RPC.
#[derive(Debug, Clone)]
pub struct EvmAttestationReader {
    rpc: JsonRpcClient,
    contract: String,
}

impl EvmAttestationReader {
    pub fn new(rpc: JsonRpcClient, contract: impl Into<String>) -> Result<Self, AttestationError> {
        let contract = contract.into();
        if !is_valid_eth_address(&contract) {
            return Err(AttestationError::Config(format!(
                "invalid attestation contract address: {contract}"
            )));
        }
        Ok(Self { rpc, contract })
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }
}

#[async_trait]
impl AttestationReader for EvmAttestationReader {
    async fn attestation(&self, leaf: B256) -> Result<AttestationRecord, AttestationError> {
        let not_found = |reason: String| AttestationError::NotFound { leaf, reason };

        let ret = self
            .rpc
            .eth_call(&self.contract, &attestations_calldata(&leaf))
            .await
            .map_err(|e| not_found(e.to_string()))?;
        let record = AttestationRecord::decode(&ret)
            .map_err(|e| not_found(format!("undecodable return data: {e}")))?;
        if record.is_empty() {
            return Err(not_found("leaf has not been attested".into()));
        }

        tracing::info!(
            leaf = %leaf,
            block_number = record.block_number,
            leaf_index = record.leaf_index,
            "attestation found"
        );
        Ok(record)
    }
}

/// In-memory [`AttestationReader`] for development and tests.
#[derive(Debug, Default)]
pub struct StaticAttestations {
    records: RwLock<HashMap<B256, AttestationRecord>>,
}

impl StaticAttestations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attestation.
    pub fn insert(&self, leaf: B256, record: AttestationRecord) {
        self.records.write().insert(leaf, record);
    }
}

#[async_trait]
impl AttestationReader for StaticAttestations {
    async fn attestation(&self, leaf: B256) -> Result<AttestationRecord, AttestationError> {
        self.records
            .read()
            .get(&leaf)
            .copied()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AttestationError::NotFound {
                leaf,
                reason: "leaf has not been attested".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attestations_selector() {
        // keccak256("attestations(bytes32)")[..4]
        let data = attestations_calldata(&B256::repeat_byte(0x11));
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &selector(ATTESTATIONS_SIGNATURE));
        assert_eq!(&data[4..], &[0x11; 32]);
    }

    #[test]
    fn well_known_selector() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn attest_calldata_wraps_proof_payload() {
        let proof = MerkleProofInput {
            leaf: B256::repeat_byte(9),
            ..Default::default()
        };
        let data = attest_calldata(&proof);
        assert_eq!(&data[..4], &selector(ATTEST_SIGNATURE));
        assert_eq!(&data[4..], &proof.encode()[..]);
    }

    #[test]
    fn record_decoding() {
        let mut w = AbiWriter::new();
        w.uint(1234).uint(7);
        let rec = AttestationRecord::decode(&w.finish()).unwrap();
        assert_eq!(
            rec,
            AttestationRecord {
                block_number: 1234,
                leaf_index: 7
            }
        );
        assert!(!rec.is_empty());

        let mut w = AbiWriter::new();
        w.uint(u128::from(u32::MAX) + 1).uint(0);
        assert!(AttestationRecord::decode(&w.finish()).is_err());
        assert!(AttestationRecord::decode(&[0u8; 10]).is_err());
    }

    #[tokio::test]
    async fn static_reader_treats_zero_block_as_missing() {
        let reader = StaticAttestations::new();
        let leaf = B256::repeat_byte(1);
        reader.insert(
            leaf,
            AttestationRecord {
                block_number: 0,
                leaf_index: 4,
            },
        );
        assert!(matches!(
            reader.attestation(leaf).await,
            Err(AttestationError::NotFound { .. })
        ));
    }
}

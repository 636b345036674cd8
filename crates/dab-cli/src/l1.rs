//! # L1 Sequence Scanning
//!
//! Validium rollups sequence batches on L1 by calling
//!
//! ```solidity
//! function sequenceBatchesValidium(
//!     ValidiumBatchData[] batches,       // (bytes32 transactionsHash, bytes32 forcedGlobalExitRoot,
//!                                        //  uint64 forcedTimestamp, bytes32 forcedBlockHashL1)
//!     uint32 l1InfoTreeLeafCount,
//!     uint64 maxSequenceTimestamp,
//!     bytes32 expectedFinalAccInputHash,
//!     address l2Coinbase,
//!     bytes dataAvailabilityMessage
//! )
//! ```
//!
//! on the rollup contract. Each `transactionsHash` is the keccak-256 of a
//! batch's data, which is exactly the fallback store key of that batch.
//! [`L1Scanner`] walks an L1 block's transactions and collects those hashes.

use dab_attest::rpc::is_valid_eth_address;
use dab_attest::{selector, JsonRpcClient, JsonRpcError};
use dab_core::abi::{AbiReader, AbiWriter, WORD};
use dab_core::{AbiError, B256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Canonical signature of the sequencing call.
pub const SEQUENCE_BATCHES_VALIDIUM_SIGNATURE: &str =
    "sequenceBatchesValidium((bytes32,bytes32,uint64,bytes32)[],uint32,uint64,bytes32,address,bytes)";

const HEAD_WORDS: usize = 6;
const BATCH_WORDS: usize = 4;

/// Errors from L1 scanning.
#[derive(Error, Debug)]
pub enum L1Error {
    #[error("calldata is not a sequenceBatchesValidium call")]
    NotSequenceBatches,

    #[error("malformed sequenceBatchesValidium calldata: {0}")]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Rpc(#[from] JsonRpcError),

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("invalid block response for block {block}: {message}")]
    InvalidBlock { block: u64, message: String },

    #[error("invalid rollup contract address: {0}")]
    InvalidAddress(String),
}

/// One entry of the `batches` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidiumBatchData {
    pub transactions_hash: B256,
    pub forced_global_exit_root: B256,
    pub forced_timestamp: u64,
    pub forced_block_hash_l1: B256,
}

/// Decoded arguments of a `sequenceBatchesValidium` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceBatchesValidium {
    pub batches: Vec<ValidiumBatchData>,
    pub l1_info_tree_leaf_count: u32,
    pub max_sequence_timestamp: u64,
    pub expected_final_acc_input_hash: B256,
    #[serde(serialize_with = "serialize_hex")]
    pub l2_coinbase: [u8; 20],
    #[serde(serialize_with = "serialize_hex")]
    pub data_availability_message: Vec<u8>,
}

fn serialize_hex<T, S>(bytes: &T, s: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: serde::Serializer,
{
    s.serialize_str(&format!("0x{}", hex::encode(bytes.as_ref())))
}

impl SequenceBatchesValidium {
    /// Decode call input, selector included.
    pub fn decode_calldata(calldata: &[u8]) -> Result<Self, L1Error> {
        if calldata.len() < 4 || calldata[..4] != selector(SEQUENCE_BATCHES_VALIDIUM_SIGNATURE) {
            return Err(L1Error::NotSequenceBatches);
        }
        let r = AbiReader::new(&calldata[4..]);

        let batches_at = r.offset_at(0)?;
        let count = r.offset_at(batches_at)?;
        let start = batches_at + WORD;
        let room = r.len().saturating_sub(start) / (BATCH_WORDS * WORD);
        if count > room {
            return Err(AbiError::OutOfRange {
                offset: batches_at,
                value: count,
            }
            .into());
        }
        let batches = (0..count)
            .map(|i| {
                let at = start + i * BATCH_WORDS * WORD;
                Ok(ValidiumBatchData {
                    transactions_hash: r.b256_at(at)?,
                    forced_global_exit_root: r.b256_at(at + WORD)?,
                    forced_timestamp: r.uint_at(at + 2 * WORD, 64)? as u64,
                    forced_block_hash_l1: r.b256_at(at + 3 * WORD)?,
                })
            })
            .collect::<Result<Vec<_>, AbiError>>()?;

        let coinbase_word = r.word_at(4 * WORD)?;
        if coinbase_word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow {
                offset: 4 * WORD,
                bits: 160,
            }
            .into());
        }
        let mut l2_coinbase = [0u8; 20];
        l2_coinbase.copy_from_slice(&coinbase_word[12..]);

        let message_at = r.offset_at(5 * WORD)?;

        Ok(Self {
            batches,
            l1_info_tree_leaf_count: r.uint_at(WORD, 32)? as u32,
            max_sequence_timestamp: r.uint_at(2 * WORD, 64)? as u64,
            expected_final_acc_input_hash: r.b256_at(3 * WORD)?,
            l2_coinbase,
            data_availability_message: r.bytes_at(message_at)?.to_vec(),
        })
    }

    /// Encode as call input, selector included.
    pub fn encode_calldata(&self) -> Vec<u8> {
        let batches_at = HEAD_WORDS * WORD;
        let message_at = batches_at + WORD + self.batches.len() * BATCH_WORDS * WORD;
        let mut coinbase = [0u8; 32];
        coinbase[12..].copy_from_slice(&self.l2_coinbase);

        let mut w = AbiWriter::new();
        w.raw(&selector(SEQUENCE_BATCHES_VALIDIUM_SIGNATURE))
            .uint(batches_at as u128)
            .uint(u128::from(self.l1_info_tree_leaf_count))
            .uint(u128::from(self.max_sequence_timestamp))
            .b256(self.expected_final_acc_input_hash)
            .word(coinbase)
            .uint(message_at as u128)
            .uint(self.batches.len() as u128);
        for b in &self.batches {
            w.b256(b.transactions_hash)
                .b256(b.forced_global_exit_root)
                .uint(u128::from(b.forced_timestamp))
                .b256(b.forced_block_hash_l1);
        }
        w.bytes_tail(&self.data_availability_message);
        w.finish()
    }

    pub fn transactions_hashes(&self) -> Vec<B256> {
        self.batches.iter().map(|b| b.transactions_hash).collect()
    }
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    hash: String,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    input: String,
}

/// Finds sequenced batch hashes in L1 blocks.
#[derive(Debug, Clone)]
pub struct L1Scanner {
    rpc: JsonRpcClient,
    rollup_contract: String,
}

impl L1Scanner {
    pub fn new(rpc: JsonRpcClient, rollup_contract: &str) -> Result<Self, L1Error> {
        if !is_valid_eth_address(rollup_contract) {
            return Err(L1Error::InvalidAddress(rollup_contract.to_string()));
        }
        Ok(Self {
            rpc,
            rollup_contract: rollup_contract.to_ascii_lowercase(),
        })
    }

    /// Every `transactionsHash` sequenced to the rollup contract in `block`,
    /// in transaction order.
    pub async fn batch_hashes(&self, block: u64) -> Result<Vec<B256>, L1Error> {
        let result = self
            .rpc
            .call("eth_getBlockByNumber", json!([format!("0x{block:x}"), true]))
            .await?;
        if result.is_null() {
            return Err(L1Error::BlockNotFound(block));
        }
        let parsed: RpcBlock =
            serde_json::from_value(result).map_err(|e| L1Error::InvalidBlock {
                block,
                message: e.to_string(),
            })?;

        let mut hashes = Vec::new();
        for tx in parsed.transactions {
            let to_rollup = tx
                .to
                .as_deref()
                .is_some_and(|to| to.eq_ignore_ascii_case(&self.rollup_contract));
            if !to_rollup {
                continue;
            }
            let input = hex::decode(tx.input.trim_start_matches("0x")).map_err(|e| {
                L1Error::InvalidBlock {
                    block,
                    message: format!("transaction {} has invalid input: {e}", tx.hash),
                }
            })?;
            match SequenceBatchesValidium::decode_calldata(&input) {
                Ok(call) => {
                    tracing::info!(tx = %tx.hash, batches = call.batches.len(), "sequenceBatchesValidium call");
                    hashes.extend(call.transactions_hashes());
                }
                Err(L1Error::NotSequenceBatches) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(batches: usize) -> SequenceBatchesValidium {
        SequenceBatchesValidium {
            batches: (0..batches)
                .map(|i| ValidiumBatchData {
                    transactions_hash: B256::repeat_byte(i as u8 + 1),
                    forced_global_exit_root: B256::ZERO,
                    forced_timestamp: 0,
                    forced_block_hash_l1: B256::ZERO,
                })
                .collect(),
            l1_info_tree_leaf_count: 12,
            max_sequence_timestamp: 1_717_000_000,
            expected_final_acc_input_hash: B256::repeat_byte(0xee),
            l2_coinbase: [0xcb; 20],
            data_availability_message: vec![1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn decodes_encoded_call() {
        let call = sample(3);
        let data = call.encode_calldata();
        // selector + 6 head words + length + 3 * 4 batch words + bytes tail
        assert_eq!(data.len(), 4 + (6 + 1 + 12 + 2) * 32);
        let back = SequenceBatchesValidium::decode_calldata(&data).unwrap();
        assert_eq!(back, call);
        assert_eq!(
            back.transactions_hashes(),
            vec![B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3)]
        );
    }

    #[test]
    fn other_methods_are_skipped() {
        let mut data = sample(1).encode_calldata();
        data[0] ^= 0xff;
        assert!(matches!(
            SequenceBatchesValidium::decode_calldata(&data),
            Err(L1Error::NotSequenceBatches)
        ));
        assert!(matches!(
            SequenceBatchesValidium::decode_calldata(&[0xab]),
            Err(L1Error::NotSequenceBatches)
        ));
    }

    #[test]
    fn truncated_calldata_is_rejected() {
        let data = sample(2).encode_calldata();
        for cut in [4 + 32, 4 + 6 * 32, data.len() - 40] {
            assert!(
                matches!(
                    SequenceBatchesValidium::decode_calldata(&data[..cut]),
                    Err(L1Error::Abi(_))
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn inflated_batch_count_is_rejected() {
        let mut data = sample(1).encode_calldata();
        // Length word of the batches array.
        let at = 4 + 6 * 32;
        data[at + 31] = 200;
        assert!(matches!(
            SequenceBatchesValidium::decode_calldata(&data),
            Err(L1Error::Abi(AbiError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn empty_batch_list() {
        let call = sample(0);
        let back = SequenceBatchesValidium::decode_calldata(&call.encode_calldata()).unwrap();
        assert!(back.batches.is_empty());
        assert_eq!(back.data_availability_message, vec![1, 2, 3, 4, 5]);
    }
}

//! Client for a data availability committee node's `sync_getOffChainData`.

use dab_attest::rpc::decode_hex_result;
use dab_attest::{JsonRpcClient, JsonRpcError};
use dab_core::{keccak256, B256};
use serde_json::json;
use thiserror::Error;

const METHOD: &str = "sync_getOffChainData";

#[derive(Error, Debug)]
pub enum DacError {
    #[error(transparent)]
    Rpc(#[from] JsonRpcError),

    /// The committee served bytes that do not hash to the requested key.
    #[error("DAC returned data hashing to {actual} for {expected}")]
    Mismatch { expected: B256, actual: B256 },
}

impl DacError {
    /// Transport and remote failures may clear up; bad content will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DacError::Rpc(_))
    }
}

#[derive(Debug, Clone)]
pub struct DacClient {
    rpc: JsonRpcClient,
}

impl DacClient {
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }

    /// Fetch the batch data keyed by `hash` and check it against the key.
    pub async fn get_off_chain_data(&self, hash: &B256) -> Result<Vec<u8>, DacError> {
        let result = self.rpc.call(METHOD, json!([hash.to_string()])).await?;
        let data = decode_hex_result(METHOD, &result)?;
        let actual = keccak256(&data);
        if actual != *hash {
            return Err(DacError::Mismatch {
                expected: *hash,
                actual,
            });
        }
        Ok(data)
    }
}

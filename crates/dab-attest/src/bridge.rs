//! # Bridge Proof Client
//!
//! Polls the bridge proof service until it serves the Merkle inclusion
//! proof for a submission:
//!
//! ```text
//! GET {api_url}/eth/proof/{0x block hash}?index={tx index}
//! ```
//!
//! ## Polling Policy
//!
//! Up to `retry_count` requests with a fixed `wait_interval` between them.
//! Transport errors and non-200 statuses mean "not ready yet" and are
//! retried. A 200 whose body does not parse is fatal. Running out of
//! attempts yields [`AttestationError::Timeout`]. The wait between attempts
//! races the caller's cancellation signal.

use std::str::FromStr;
use std::time::Duration;

use dab_core::{run_with_retry_if, Cancellation, MerkleProofInput, RetryError, RetryPolicy, B256, U256};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::error::AttestationError;

/// Default number of proof requests.
pub const DEFAULT_RETRY_COUNT: u32 = 10;
/// Default wait between proof requests.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(420);

/// JSON body served by the bridge proof endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeApiResponse {
    pub blob_root: B256,
    #[serde(default)]
    pub block_hash: B256,
    pub bridge_root: B256,
    #[serde(default)]
    pub data_root: B256,
    #[serde(deserialize_with = "index_from_json")]
    pub data_root_index: U256,
    #[serde(default)]
    pub data_root_commitment: B256,
    pub data_root_proof: Vec<B256>,
    pub leaf: B256,
    #[serde(deserialize_with = "index_from_json")]
    pub leaf_index: U256,
    pub leaf_proof: Vec<B256>,
    pub range_hash: B256,
}

/// Proof indices arrive as JSON numbers or as decimal/0x strings.
fn index_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(u64),
        Text(String),
    }
    match Index::deserialize(deserializer)? {
        Index::Number(n) => Ok(U256::from(n)),
        Index::Text(s) => U256::from_str(s.trim()).map_err(de::Error::custom),
    }
}

impl From<BridgeApiResponse> for MerkleProofInput {
    fn from(resp: BridgeApiResponse) -> Self {
        MerkleProofInput {
            data_root_proof: resp.data_root_proof,
            leaf_proof: resp.leaf_proof,
            range_hash: resp.range_hash,
            data_root_index: resp.data_root_index,
            blob_root: resp.blob_root,
            bridge_root: resp.bridge_root,
            leaf: resp.leaf,
            leaf_index: resp.leaf_index,
        }
    }
}

/// Bridge proof service settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the proof service.
    pub api_url: String,
    /// Total requests before giving up.
    pub retry_count: u32,
    /// Wait between requests.
    pub wait_interval: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            retry_count: DEFAULT_RETRY_COUNT,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Override the polling schedule.
    pub fn with_polling(mut self, retry_count: u32, wait_interval: Duration) -> Self {
        self.retry_count = retry_count;
        self.wait_interval = wait_interval;
        self
    }
}

#[derive(Error, Debug)]
enum ProofFetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("cannot read body: {0}")]
    Body(String),
    #[error("cannot parse proof: {0}")]
    Parse(String),
}

impl ProofFetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, ProofFetchError::Transport(_) | ProofFetchError::Status(_))
    }
}

/// Client for the bridge proof service.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl BridgeClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, AttestationError> {
        Url::parse(&config.api_url).map_err(|e| {
            AttestationError::Config(format!("invalid bridge API URL {:?}: {e}", config.api_url))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AttestationError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::fixed(config.retry_count, config.wait_interval),
        })
    }

    /// Proof URL for a submission.
    pub fn proof_url(&self, block_hash: &B256, index: u32) -> String {
        format!("{}/eth/proof/{block_hash}?index={index}", self.base_url)
    }

    /// Poll until the proof for `(block_hash, index)` is served.
    pub async fn fetch_proof(
        &self,
        block_hash: B256,
        index: u32,
        cancel: &Cancellation,
    ) -> Result<MerkleProofInput, AttestationError> {
        let url = self.proof_url(&block_hash, index);
        tracing::info!(url = %url, "requesting bridge proof");
        let url = url.as_str();

        let outcome = run_with_retry_if(
            self.policy,
            cancel,
            |_attempt| self.fetch_once(url),
            ProofFetchError::is_retryable,
        )
        .await;

        match outcome {
            Ok(resp) => {
                tracing::info!(leaf = %resp.leaf, leaf_index = %resp.leaf_index, "bridge proof received");
                Ok(resp.into())
            }
            Err(RetryError::Cancelled) => Err(AttestationError::Cancelled),
            Err(RetryError::Exhausted { attempts, last }) => Err(AttestationError::Timeout {
                block_hash,
                index,
                attempts,
                last: last.to_string(),
            }),
            Err(RetryError::Fatal { error, .. }) => {
                Err(AttestationError::MalformedProof(error.to_string()))
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<BridgeApiResponse, ProofFetchError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProofFetchError::Transport(e.to_string()))?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(ProofFetchError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| ProofFetchError::Body(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ProofFetchError::Parse(e.to_string()))
    }
}

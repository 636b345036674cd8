//! # Ethereum JSON-RPC Client
//!
//! A thin JSON-RPC 2.0 client over `reqwest`. Used for attestation contract
//! reads (`eth_call`), L1 block scans, and the DAC `sync_getOffChainData`
//! lookup.
//!
//! The client does not retry; callers wrap calls with
//! [`dab_core::run_with_retry`] where a call is best-effort.

use std::time::Duration;

use serde_json::{json, Value};
use url::Url;

use crate::error::{AttestationError, JsonRpcError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC 2.0 client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: Url,
}

impl JsonRpcClient {
    /// Client for `url` with the default timeout.
    pub fn new(url: &str) -> Result<Self, AttestationError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, AttestationError> {
        let url = Url::parse(url)
            .map_err(|e| AttestationError::Config(format!("invalid RPC URL {url:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AttestationError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send a request and return its `result` field.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| JsonRpcError::Transport {
                method: method.to_string(),
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        if !resp.status().is_success() {
            return Err(JsonRpcError::Http {
                method: method.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let json: Value = resp.json().await.map_err(|e| JsonRpcError::InvalidResponse {
            method: method.to_string(),
            message: format!("invalid JSON: {e}"),
        })?;

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            return Err(JsonRpcError::Remote {
                method: method.to_string(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown RPC error")
                    .to_string(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| JsonRpcError::InvalidResponse {
                method: method.to_string(),
                message: "missing 'result' field".to_string(),
            })
    }

    /// `eth_call` against `to` at the latest block, returning the decoded
    /// return data.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, JsonRpcError> {
        let params = json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let result = self.call("eth_call", params).await?;
        decode_hex_result("eth_call", &result)
    }
}

/// Decode a `0x`-prefixed hex string result.
pub fn decode_hex_result(method: &str, value: &Value) -> Result<Vec<u8>, JsonRpcError> {
    let invalid = |message: String| JsonRpcError::InvalidResponse {
        method: method.to_string(),
        message,
    };
    let s = value
        .as_str()
        .ok_or_else(|| invalid(format!("expected hex string, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| invalid(format!("invalid hex: {e}")))
}

/// Parse a `0x`-prefixed hex quantity (`eth_blockNumber` style).
pub fn parse_quantity(method: &str, value: &Value) -> Result<u64, JsonRpcError> {
    let s = value.as_str().ok_or_else(|| JsonRpcError::InvalidResponse {
        method: method.to_string(),
        message: format!("expected hex quantity, got {value}"),
    })?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| {
        JsonRpcError::InvalidResponse {
            method: method.to_string(),
            message: format!("invalid quantity {s:?}: {e}"),
        }
    })
}

/// Validate that a string is a well-formed Ethereum address (0x + 40 hex chars).
pub fn is_valid_eth_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}

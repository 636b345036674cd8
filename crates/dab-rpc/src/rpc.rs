//! # Request Parsing and Dispatch
//!
//! A request is validated against [`METHODS`] and turned into a typed
//! [`RpcCall`] before it reaches the backend, so handlers never see
//! unchecked parameters.
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `sync_getOffChainData` | `[hash]` (32-byte hex, `0x` optional) | `0x` hex of the stored bytes |

use dab_core::{Cancellation, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorObject, RpcError};
use crate::state::AppState;

/// Supported methods and their parameter counts.
pub const METHODS: &[(&str, usize)] = &[("sync_getOffChainData", 1)];

/// Incoming request as sent on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// Outgoing response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
    pub id: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: &RpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error.to_object()),
            id,
        }
    }
}

/// A validated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    GetOffChainData { hash: B256 },
}

impl RpcCall {
    /// Validate `method` and `params` against the method table.
    pub fn parse(method: &str, params: &Value) -> Result<Self, RpcError> {
        let arity = METHODS
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, arity)| *arity)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;

        let args = match params {
            Value::Array(args) => args.as_slice(),
            Value::Null => &[],
            _ => return Err(RpcError::InvalidParams("params must be an array".into())),
        };
        if args.len() != arity {
            return Err(RpcError::InvalidParams(format!(
                "{method} expects {arity} parameter(s), got {}",
                args.len()
            )));
        }

        match method {
            "sync_getOffChainData" => {
                let hash = args[0]
                    .as_str()
                    .ok_or_else(|| RpcError::InvalidParams("hash must be a string".into()))?
                    .parse::<B256>()
                    .map_err(|e| RpcError::InvalidParams(format!("invalid hash: {e}")))?;
                Ok(RpcCall::GetOffChainData { hash })
            }
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            RpcCall::GetOffChainData { .. } => "sync_getOffChainData",
        }
    }

    /// Run the call against the backend.
    pub async fn execute(&self, state: &AppState) -> Result<Value, RpcError> {
        match self {
            RpcCall::GetOffChainData { hash } => {
                let data = state
                    .backend
                    .get_off_chain_data(hash, &Cancellation::never())
                    .await?;
                Ok(Value::String(format!("0x{}", hex::encode(data))))
            }
        }
    }
}

/// Parse, dispatch, and answer one request body.
pub async fn handle(state: &AppState, body: &[u8]) -> RpcResponse {
    let raw: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return RpcResponse::failure(Value::Null, &RpcError::Parse(e.to_string())),
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => return RpcResponse::failure(id, &RpcError::InvalidRequest(e.to_string())),
    };
    if let Some(version) = request.jsonrpc.as_deref().filter(|v| *v != "2.0") {
        let err = RpcError::InvalidRequest(format!("unsupported jsonrpc version {version:?}"));
        return RpcResponse::failure(request.id, &err);
    }

    let started = std::time::Instant::now();
    let outcome = match RpcCall::parse(&request.method, &request.params) {
        Ok(call) => call.execute(state).await,
        Err(e) => Err(e),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(result) => {
            tracing::info!(method = %request.method, elapsed_ms, "rpc request succeeded");
            RpcResponse::success(request.id, result)
        }
        Err(err) => {
            tracing::warn!(method = %request.method, code = err.code(), error = %err, elapsed_ms, "rpc request failed");
            RpcResponse::failure(request.id, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_method() {
        let hash = format!("0x{}", "ab".repeat(32));
        let call = RpcCall::parse("sync_getOffChainData", &json!([hash])).unwrap();
        assert_eq!(call, RpcCall::GetOffChainData { hash: B256::repeat_byte(0xab) });
        assert_eq!(call.method(), "sync_getOffChainData");
    }

    #[test]
    fn unknown_method() {
        let err = RpcCall::parse("eth_blockNumber", &json!([])).unwrap_err();
        assert_eq!(err.code(), -32601);
    }

    #[test]
    fn wrong_arity_and_types() {
        for params in [
            json!([]),
            json!(["0x00", "0x01"]),
            json!([42]),
            json!(["0x1234"]),
            json!({"hash": "0x00"}),
        ] {
            let err = RpcCall::parse("sync_getOffChainData", &params).unwrap_err();
            assert_eq!(err.code(), -32602, "{params}");
        }
    }

    #[test]
    fn response_shape() {
        let ok = serde_json::to_value(RpcResponse::success(json!(1), json!("0x00"))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "result": "0x00", "id": 1}));

        let err = RpcResponse::failure(json!("a"), &RpcError::MethodNotFound("m".into()));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["error"]["code"], -32601);
        assert!(err.get("result").is_none());
        assert_eq!(err["id"], "a");
    }
}

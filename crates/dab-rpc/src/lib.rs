//! # dab-rpc: DA Bridge JSON-RPC Server
//!
//! Serves batch data to rollup nodes that read DA bridge pointers.
//!
//! ## API Surface
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/rpc` | JSON-RPC 2.0 endpoint, see [`rpc`] for the method table |
//! | GET | `/health` | `OK` when the fallback store backend is reachable |
//!
//! JSON-RPC failures are answered with HTTP 200 and an `error` object;
//! only transport-level problems produce other statuses.

pub mod error;
pub mod rpc;
pub mod state;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

pub use error::{ErrorObject, RpcError};
pub use rpc::{RpcCall, RpcRequest, RpcResponse, METHODS};
pub use state::AppState;

/// Assemble the router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    Json(rpc::handle(&state, &body).await)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let Some(store) = state.backend.fallback() else {
        return (StatusCode::OK, "OK".to_string());
    };
    match store.health_check().await {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "fallback store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, format!("fallback store unavailable: {err}"))
        }
    }
}

//! # dab-rpc: Binary Entry Point
//!
//! Starts the JSON-RPC server. Configuration comes from the environment
//! (see `BackendConfig::from_env`); the listen port from `PORT` (default
//! 8080).

use anyhow::Context;
use dab_backend::{BackendConfig, DaBackend};
use dab_rpc::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let config = BackendConfig::from_env().context("invalid backend configuration")?;
    tracing::debug!(?config, "backend configuration loaded");

    // No chain client is linked into this binary: lookups are served from
    // the fallback store.
    let backend = DaBackend::from_config(&config, None)
        .await
        .context("failed to initialize backend")?;
    if backend.fallback().is_none() {
        tracing::warn!("no fallback store configured; every lookup will fail");
    }

    let app = dab_rpc::app(AppState::new(backend));
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!(%addr, "DA bridge RPC server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

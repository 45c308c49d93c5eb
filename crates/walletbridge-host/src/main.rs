//! walletbridge portal host.
//!
//! - WebSocket endpoint: /v1/portal?origin=<page url>&tab=<id>
//! - Approval and session admin routes for the wallet popup
//! - Heartbeat ping + idle timeout per page context

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use walletbridge_core::{BridgeError, Result};
use walletbridge_host::{app_state, config, server};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("WALLETBRIDGE_CONFIG").unwrap_or_else(|_| "walletbridge.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| BridgeError::Config(format!("server.listen must be a valid SocketAddr: {e}")))?;

    let state = app_state::AppState::new(cfg)?;
    let app = server::build_router(state);

    tracing::info!(%listen, "walletbridge-host starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| BridgeError::Config(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| BridgeError::Internal(format!("server failed: {e}")))
}

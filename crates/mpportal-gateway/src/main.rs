//! mpPortal gateway binary.
//!
//! - Callback endpoint: /v1/portal/:app_id (GET handshake, POST push)
//! - Verify-once, decode-once pipeline with a reply deadline
//! - Tracing span per request
//! - Graceful shutdown on Ctrl-C (readyz flips to draining)

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use mpportal_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = config::config_path();
    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(%path, error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };
    let listen: SocketAddr = match cfg.gateway.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(listen = %cfg.gateway.listen, error = %e, "gateway.listen must be a valid SocketAddr");
            return ExitCode::FAILURE;
        }
    };

    let state = match app_state::AppState::new(cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "app state init failed");
            return ExitCode::FAILURE;
        }
    };
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "mpportal-gateway starting");
    let listener = match tokio::net::TcpListener::bind(listen).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%listen, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown requested, draining");
        state.set_draining();
    };
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

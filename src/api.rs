//! Liveness endpoint for hosting platforms.
//!
//! Spawned as a background task in the gateway, same pattern as the scheduler.

use axum::{routing::get, Router};
use nudge_core::config::HealthConfig;
use tracing::{error, info};

/// `GET /`: short banner.
async fn index() -> &'static str {
    "nudge reminder bot is running"
}

/// `GET /health`: plain `OK` while the process is up.
async fn health() -> &'static str {
    "OK"
}

fn build_router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

/// Start the liveness server. Called from `Gateway::run()`.
pub async fn serve(config: HealthConfig) {
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("health server failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("health server listening on {addr}");

    if let Err(e) = axum::serve(listener, build_router()).await {
        error!("health server error: {e}");
    }
}

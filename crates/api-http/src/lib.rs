// Liveness HTTP Surface
//
// Minimal by design: orchestration infrastructure probes `GET /` for a
// fixed acknowledgment. Nothing in the worker's own logic depends on it.

use axum::{routing::get, Router};
use conductor_core::application::ShutdownToken;
use tracing::info;

/// Fixed payload returned to health probes
pub const READY_BANNER: &str = "conductor worker: ready";

pub fn router() -> Router {
    Router::new().route("/", get(|| async { READY_BANNER }))
}

/// Serve the liveness endpoint until the shutdown token fires
pub async fn serve(port: u16, shutdown: ShutdownToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "liveness endpoint listening");

    let mut shutdown = shutdown;
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, ready, status, AppState};

/// Create the API router.
///
/// Prometheus metrics are served by the exporter on their own port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status endpoint
        .route("/api/v1/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

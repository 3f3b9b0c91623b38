//! Liveness endpoints.

use axum::{Json, Router, routing::get};

use eventgate_telemetry::health::HealthResponse;

use crate::state::AppState;

/// GET / and GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok(env!("CARGO_PKG_VERSION")))
}

/// Returns the liveness router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
}

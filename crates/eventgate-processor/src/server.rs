//! Liveness and metrics endpoints for the processor.

use axum::{Json, Router, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;

use eventgate_telemetry::health::HealthResponse;

/// GET / and GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok(env!("CARGO_PKG_VERSION")))
}

/// Builds the processor's observability router.
pub fn router(metrics: PrometheusHandle) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route(
            "/metrics",
            get(move || {
                let handle = metrics.clone();
                async move { handle.render() }
            }),
        )
}

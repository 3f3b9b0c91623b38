//! Prometheus metrics exposition.

use axum::Router;
use axum::extract::State;
use axum::routing::get;

use crate::state::AppState;

/// GET /metrics
async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// Returns the metrics router.
pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(render_metrics))
}

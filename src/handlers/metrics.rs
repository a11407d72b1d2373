use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::metrics::{self, RATE_LIMIT_TRACKED_KEYS};
use crate::state::AppState;

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // sampled per scrape, counting buckets locks every shard
    RATE_LIMIT_TRACKED_KEYS.set(state.rate_limiter.tracked_keys() as f64);

    match metrics::render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::HealthResponse;
use crate::state::AppState;

// Reports config only, never touches auth or the rate limiter
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.dispatcher.model().to_string(),
        offline: state.dispatcher.offline_mode(),
    })
}

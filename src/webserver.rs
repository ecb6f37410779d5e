use crate::state::CycleStatus;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

pub async fn readiness_probe() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn liveness_probe() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Last cycle outcome as JSON, 204 until the first cycle has finished.
pub async fn last_cycle(State(status): State<CycleStatus>) -> impl IntoResponse {
    match status.last().await {
        Some(report) => Json(report).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub fn create_app(status: CycleStatus) -> Router {
    Router::new()
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/status", get(last_cycle))
        .with_state(status)
}

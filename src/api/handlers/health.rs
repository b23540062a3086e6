use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use crate::AppState;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub frames_to_sample: usize,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    // The classifier is loaded before the listener binds, so reaching this
    // handler means the model is available.
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.analyzer.classifier_name(),
        frames_to_sample: state.analyzer.settings().frames_to_sample,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

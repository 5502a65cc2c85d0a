use axum::{Json, extract::State};

use pinboard_types::api::HealthResponse;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        message: "API is running".into(),
        timestamp: chrono::Utc::now(),
        total_messages: state.messages.count(),
    })
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use pinboard_types::api::{ApiResponse, CreateMessageRequest, UpdateMessageRequest};

use crate::error::ApiError;
use crate::extract::{IdPath, JsonBody};
use crate::state::AppState;

// The board is an in-memory map behind a std mutex; calls return without
// blocking on I/O, so they run directly on the async thread.

pub async fn get_messages(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.messages.get_all()))
}

pub async fn create_message(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let message = state.messages.create(&req.username, &req.content)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message))))
}

pub async fn update_message(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let message = state.messages.update(id, &req.content)?;
    Ok(Json(ApiResponse::ok(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    state.messages.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

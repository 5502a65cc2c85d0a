use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use pinboard_types::api::{ApiResponse, CreateUserRequest, UpdateUserRequest};

use crate::error::ApiError;
use crate::extract::{IdPath, JsonBody};
use crate::state::{AppState, with_db};

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = with_db(&state, |db| db.list_users()).await?;
    Ok(Json(ApiResponse::ok(users)))
}

pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let now = Utc::now();
    let user = with_db(&state, move |db| db.create_user(&req, now)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let user = with_db(&state, move |db| db.get_user_by_id(id)).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let user = with_db(&state, move |db| db.update_user(id, &req, now)).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    let now = Utc::now();
    with_db(&state, move |db| db.delete_user(id, now)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/{id}/posts
pub async fn list_user_posts(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let posts = with_db(&state, move |db| {
        db.get_user_by_id(id)?;
        db.list_posts_by_user(id)
    })
    .await?;
    Ok(Json(ApiResponse::ok(posts)))
}

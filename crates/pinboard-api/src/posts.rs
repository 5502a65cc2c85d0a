use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use pinboard_types::api::{ApiResponse, CreatePostRequest, UpdatePostRequest};

use crate::error::ApiError;
use crate::extract::{IdPath, JsonBody, parse_id};
use crate::state::{AppState, with_db};

pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = with_db(&state, |db| db.list_posts()).await?;
    Ok(Json(ApiResponse::ok(posts)))
}

pub async fn create_post(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let now = Utc::now();
    let post = with_db(&state, move |db| db.create_post(&req, now)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(post))))
}

pub async fn get_post(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let post = with_db(&state, move |db| db.get_post_by_id(id)).await?;
    Ok(Json(ApiResponse::ok(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let post = with_db(&state, move |db| db.update_post(id, &req, now)).await?;
    Ok(Json(ApiResponse::ok(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    let now = Utc::now();
    with_db(&state, move |db| db.delete_post(id, now)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Category links --

/// GET /api/posts/{id}/categories
pub async fn list_post_categories(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let categories = with_db(&state, move |db| db.list_categories_for_post(id)).await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// PUT /api/posts/{id}/categories/{category_id}
pub async fn attach_category(
    State(state): State<AppState>,
    Path((post_id, category_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let post_id = parse_id(&post_id)?;
    let category_id = parse_id(&category_id)?;
    with_db(&state, move |db| db.attach_category(post_id, category_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/posts/{id}/categories/{category_id}
pub async fn detach_category(
    State(state): State<AppState>,
    Path((post_id, category_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let post_id = parse_id(&post_id)?;
    let category_id = parse_id(&category_id)?;
    with_db(&state, move |db| db.detach_category(post_id, category_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use pinboard_types::api::{ApiResponse, CreateCategoryRequest, UpdateCategoryRequest};

use crate::error::ApiError;
use crate::extract::{IdPath, JsonBody};
use crate::state::{AppState, with_db};

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    /// `?active=true` limits the listing to active categories.
    #[serde(default)]
    pub active: bool,
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = with_db(&state, move |db| {
        if query.active {
            db.list_active_categories()
        } else {
            db.list_categories()
        }
    })
    .await?;
    Ok(Json(ApiResponse::ok(categories)))
}

pub async fn create_category(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let now = Utc::now();
    let category = with_db(&state, move |db| db.create_category(&req, now)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(category))))
}

pub async fn get_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let category = with_db(&state, move |db| db.get_category_by_id(id)).await?;
    Ok(Json(ApiResponse::ok(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let category = with_db(&state, move |db| db.update_category(id, &req, now)).await?;
    Ok(Json(ApiResponse::ok(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    let now = Utc::now();
    with_db(&state, move |db| db.delete_category(id, now)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/categories/{id}/posts
pub async fn list_category_posts(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let posts = with_db(&state, move |db| db.list_posts_for_category(id)).await?;
    Ok(Json(ApiResponse::ok(posts)))
}

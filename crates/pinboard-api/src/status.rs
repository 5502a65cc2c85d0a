use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use pinboard_types::api::{ApiResponse, HttpStatusResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Canned description for the handful of codes the board knows about.
pub fn describe_status(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown Status",
    }
}

/// Accepts 100–599 only.
fn parse_status_code(raw: &str) -> Result<u16, ApiError> {
    raw.parse::<u16>()
        .ok()
        .filter(|code| (100..=599).contains(code))
        .ok_or_else(|| ApiError::BadRequest("Invalid status code".into()))
}

/// GET /api/status/{code}
pub async fn get_status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_status_code(&raw)?;

    Ok(Json(ApiResponse::ok(HttpStatusResponse {
        status_code: code,
        image_url: state.image_url(code),
        description: describe_status(code).to_string(),
    })))
}

/// GET /api/cat/{code} — streams the upstream image through unchanged.
pub async fn get_cat_image(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let code = parse_status_code(&raw)?;
    let url = state.upstream_image_url(code);

    let upstream = state.http.get(&url).send().await.map_err(|e| {
        warn!("Image fetch from {} failed: {}", url, e);
        ApiError::Upstream(e)
    })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    info!("Proxying {} ({})", url, status);

    let mut builder = Response::builder()
        .status(status)
        .header(header::CACHE_CONTROL, IMAGE_CACHE_CONTROL);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::Internal(format!("failed to build proxy response: {}", e)))
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use pinboard_db::StoreError;
use pinboard_types::ValidationError;
use pinboard_types::api::ApiResponse;

/// Handler error; renders as the `{success: false, error}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, id or path parameter.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl ApiError {
    pub fn invalid_body() -> Self {
        Self::BadRequest("Invalid request body".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => Self::Validation(e),
            StoreError::NoFieldsToUpdate => Self::BadRequest(err.to_string()),
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            Self::Upstream(e) => {
                error!("Upstream error: {}", e);
                "Failed to fetch upstream resource".to_string()
            }
            other => {
                warn!("Request rejected ({}): {}", status.as_u16(), other);
                other.to_string()
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status_codes() {
        let cases = [
            (StoreError::not_found("user", 3), StatusCode::NOT_FOUND),
            (StoreError::NoFieldsToUpdate, StatusCode::BAD_REQUEST),
            (
                StoreError::Validation(ValidationError::ContentRequired),
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                StoreError::LockPoisoned("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn not_found_message_names_the_row() {
        let err = ApiError::from(StoreError::not_found("message", 9));
        assert_eq!(err.to_string(), "message 9 not found");
    }
}

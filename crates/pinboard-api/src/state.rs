use std::sync::Arc;

use tracing::error;

use pinboard_db::{Database, MessageStore, StoreResult};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub messages: MessageStore,
    pub db: Database,
    pub http: reqwest::Client,
    /// Base URL clients use to reach this server; used to build image links.
    pub public_url: String,
    /// Upstream status-image service, e.g. `https://http.cat`.
    pub cat_api_url: String,
}

impl AppStateInner {
    pub fn image_url(&self, code: u16) -> String {
        format!("{}/api/cat/{}", self.public_url.trim_end_matches('/'), code)
    }

    pub fn upstream_image_url(&self, code: u16) -> String {
        format!("{}/{}", self.cat_api_url.trim_end_matches('/'), code)
    }
}

/// Runs a blocking SQLite call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}

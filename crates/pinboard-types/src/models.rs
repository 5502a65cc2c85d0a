use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback color for categories created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#007bff";

/// A message on the in-memory board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Hex color code, `#RRGGBB`.
    pub color: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// An empty color stands for [`DEFAULT_CATEGORY_COLOR`].
pub fn color_or_default(color: &str) -> String {
    if color.is_empty() {
        DEFAULT_CATEGORY_COLOR.to_string()
    } else {
        color.to_string()
    }
}

// -- Persistence-ready payloads --
//
// Built from validated create requests; the repository assigns the id and
// the timestamps.

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub color: String,
    pub active: bool,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NewCategory, NewPost, NewUser, color_or_default};

// -- Envelope --

/// Uniform wrapper returned by every JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMessageRequest {
    pub content: String,
}

// -- Status codes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpStatusResponse {
    pub status_code: u16,
    pub image_url: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub total_messages: usize,
}

// -- Users --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

impl CreateUserRequest {
    pub fn to_user(&self) -> NewUser {
        NewUser {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

// -- Posts --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published: bool,
}

impl CreatePostRequest {
    pub fn to_post(&self) -> NewPost {
        NewPost {
            user_id: self.user_id,
            title: self.title.clone(),
            content: self.content.clone(),
            published: self.published,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

impl UpdatePostRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.published.is_none()
    }
}

// -- Categories --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

impl CreateCategoryRequest {
    /// Fills in the default color; new categories always start active.
    pub fn to_category(&self) -> NewCategory {
        NewCategory {
            name: self.name.clone(),
            description: self.description.clone(),
            color: color_or_default(&self.color),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

impl UpdateCategoryRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_CATEGORY_COLOR;

    #[test]
    fn envelope_omits_absent_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(7)).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true, "data": 7 }));

        let err = serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(err, serde_json::json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn category_defaults_color_and_active() {
        let req: CreateCategoryRequest = serde_json::from_str(r#"{"name":"Rust"}"#).unwrap();
        let category = req.to_category();
        assert_eq!(category.color, DEFAULT_CATEGORY_COLOR);
        assert!(category.active);
        assert_eq!(category.description, "");
    }

    #[test]
    fn update_requests_report_emptiness() {
        let empty: UpdatePostRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());

        let one: UpdateUserRequest = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert!(!one.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<CreateMessageRequest>(
            r#"{"username":"a","content":"b","extra":1}"#,
        );
        assert!(parsed.is_err());
    }
}

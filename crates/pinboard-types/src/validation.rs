//! Field rules for entities and request payloads.
//!
//! Every `validate` returns the first violated rule only. Checks run in a
//! fixed order: emptiness, minimum length, maximum length, dependent fields,
//! then format.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::api::{
    CreateCategoryRequest, CreateMessageRequest, CreatePostRequest, CreateUserRequest,
    UpdateCategoryRequest, UpdateMessageRequest, UpdatePostRequest, UpdateUserRequest,
};
use crate::models::{Category, Post, User};

pub const USER_NAME_MIN: usize = 2;
pub const POST_TITLE_MIN: usize = 5;
pub const CATEGORY_NAME_MIN: usize = 2;
pub const CATEGORY_NAME_MAX: usize = 100;
pub const CATEGORY_DESCRIPTION_MAX: usize = 500;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("content is required for published posts")]
    ContentRequired,

    #[error("invalid {field} format")]
    InvalidFormat { field: &'static str },
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_color(color: &str) -> bool {
    HEX_COLOR_RE.is_match(color)
}

// -- Field rules --

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

fn min_len(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn check_user_name(name: &str) -> Result<(), ValidationError> {
    non_empty("name", name)?;
    min_len("name", name, USER_NAME_MIN)
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    non_empty("email", email)?;
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidFormat { field: "email" });
    }
    Ok(())
}

fn check_post_title(title: &str) -> Result<(), ValidationError> {
    non_empty("title", title)?;
    min_len("title", title, POST_TITLE_MIN)
}

fn check_post_body(user_id: i64, content: &str, published: bool) -> Result<(), ValidationError> {
    if user_id <= 0 {
        return Err(ValidationError::NotPositive { field: "user_id" });
    }
    if published && content.is_empty() {
        return Err(ValidationError::ContentRequired);
    }
    Ok(())
}

fn check_category_name(name: &str) -> Result<(), ValidationError> {
    non_empty("name", name)?;
    min_len("name", name, CATEGORY_NAME_MIN)?;
    max_len("name", name, CATEGORY_NAME_MAX)
}

fn check_category_description(description: &str) -> Result<(), ValidationError> {
    max_len("description", description, CATEGORY_DESCRIPTION_MAX)
}

/// An empty color means "use the default".
fn check_category_color(color: &str) -> Result<(), ValidationError> {
    if !color.is_empty() && !is_valid_color(color) {
        return Err(ValidationError::InvalidFormat { field: "color" });
    }
    Ok(())
}

// -- Messages --

impl CreateMessageRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("username", &self.username)?;
        non_empty("content", &self.content)
    }
}

impl UpdateMessageRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("content", &self.content)
    }
}

// -- Users --

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_user_name(&self.name)?;
        check_email(&self.email)
    }
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_user_name(&self.name)?;
        check_email(&self.email)
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            check_user_name(name)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        Ok(())
    }
}

// -- Posts --

impl Post {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_post_title(&self.title)?;
        check_post_body(self.user_id, &self.content, self.published)
    }
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_post_title(&self.title)?;
        check_post_body(self.user_id, &self.content, self.published)
    }
}

impl UpdatePostRequest {
    /// Only the fields carried by the request are checked. The repository
    /// checks the merged published/content pair against the stored row.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            check_post_title(title)?;
        }
        if self.published == Some(true) && self.content.as_deref() == Some("") {
            return Err(ValidationError::ContentRequired);
        }
        Ok(())
    }
}

// -- Categories --

impl Category {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_category_name(&self.name)?;
        check_category_description(&self.description)?;
        check_category_color(&self.color)
    }
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_category_name(&self.name)?;
        check_category_description(&self.description)?;
        check_category_color(&self.color)
    }
}

impl UpdateCategoryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            check_category_name(name)?;
        }
        if let Some(description) = &self.description {
            check_category_description(description)?;
        }
        if let Some(color) = &self.color {
            check_category_color(color)?;
        }
        Ok(())
    }
}

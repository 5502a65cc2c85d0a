use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{info, warn};

use pinboard_types::ValidationError;
use pinboard_types::api::{CreatePostRequest, UpdatePostRequest};
use pinboard_types::models::Post;

use crate::update::UpdateBuilder;
use crate::{Database, StoreError, StoreResult};

pub(crate) const POST_COLUMNS: &str =
    "id, user_id, title, content, published, created_at, updated_at, deleted_at";

pub(crate) fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        published: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

fn live_user_exists(conn: &Connection, user_id: i64) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1 AND deleted_at IS NULL",
            [user_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

impl Database {
    pub fn create_post(&self, req: &CreatePostRequest, now: DateTime<Utc>) -> StoreResult<Post> {
        req.validate()?;
        let new = req.to_post();

        let post = self.with_conn_mut(|conn| {
            if !live_user_exists(conn, new.user_id)? {
                warn!("Rejected post for missing user {}", new.user_id);
                return Err(StoreError::Conflict(format!(
                    "user {} does not exist",
                    new.user_id
                )));
            }

            let sql = format!(
                "INSERT INTO posts (user_id, title, content, published, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 RETURNING {}",
                POST_COLUMNS
            );
            let post = conn.query_row(
                &sql,
                params![new.user_id, new.title, new.content, new.published, now],
                post_from_row,
            )?;
            Ok(post)
        })?;

        info!("Post created: {} (id {}, user {})", post.title, post.id, post.user_id);
        Ok(post)
    }

    pub fn get_post_by_id(&self, id: i64) -> StoreResult<Post> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM posts WHERE id = ?1 AND deleted_at IS NULL",
                POST_COLUMNS
            );
            conn.query_row(&sql, [id], post_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("post", id))
        })
    }

    pub fn list_posts(&self) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM posts WHERE deleted_at IS NULL ORDER BY created_at, id",
                POST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let posts = stmt
                .query_map([], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
    }

    pub fn list_posts_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM posts
                 WHERE user_id = ?1 AND deleted_at IS NULL
                 ORDER BY created_at, id",
                POST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let posts = stmt
                .query_map([user_id], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
    }

    pub fn update_post(
        &self,
        id: i64,
        req: &UpdatePostRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Post> {
        if req.is_empty() {
            return Err(StoreError::NoFieldsToUpdate);
        }
        req.validate()?;

        let mut builder = UpdateBuilder::new("posts");
        builder
            .set_opt("title", req.title.clone())
            .set_opt("content", req.content.clone())
            .set_opt("published", req.published);
        let stmt = builder.build(id, now, POST_COLUMNS)?;

        let touches_body = req.published.is_some() || req.content.is_some();

        let post = self.with_conn_mut(|conn| {
            // A post that ends up published must keep non-empty content.
            if touches_body {
                let stored: Option<(bool, String)> = conn
                    .query_row(
                        "SELECT published, content FROM posts WHERE id = ?1 AND deleted_at IS NULL",
                        [id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let (stored_published, stored_content) =
                    stored.ok_or_else(|| StoreError::not_found("post", id))?;
                let published = req.published.unwrap_or(stored_published);
                let content = req.content.as_deref().unwrap_or(&stored_content);
                if published && content.is_empty() {
                    return Err(ValidationError::ContentRequired.into());
                }
            }

            conn.query_row(&stmt.sql, stmt.params().as_slice(), post_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("post", id))
        })?;

        info!("Post {} updated", post.id);
        Ok(post)
    }

    pub fn delete_post(&self, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        self.with_conn_mut(|conn| crate::soft_delete(conn, "posts", "post", id, now))?;
        info!("Post {} deleted", id);
        Ok(())
    }

    pub fn count_posts(&self) -> StoreResult<i64> {
        self.with_conn(|conn| crate::count_live(conn, "posts"))
    }

    /// Bypasses the soft-delete filter: `None` if the row never existed,
    /// `Some(None)` while it is live.
    pub fn post_deleted_at(&self, id: i64) -> StoreResult<Option<Option<DateTime<Utc>>>> {
        self.with_conn(|conn| crate::deleted_at(conn, "posts", id))
    }
}

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::info;

use pinboard_types::api::{CreateUserRequest, UpdateUserRequest};
use pinboard_types::models::User;

use crate::update::UpdateBuilder;
use crate::{Database, StoreError, StoreResult};

const USER_COLUMNS: &str = "id, name, email, created_at, updated_at, deleted_at";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}

impl Database {
    pub fn create_user(&self, req: &CreateUserRequest, now: DateTime<Utc>) -> StoreResult<User> {
        req.validate()?;
        let new = req.to_user();

        let user = self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO users (name, email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 RETURNING {}",
                USER_COLUMNS
            );
            let user = conn.query_row(&sql, params![new.name, new.email, now], user_from_row)?;
            Ok(user)
        })?;

        info!("User created: {} (id {})", user.name, user.id);
        Ok(user)
    }

    pub fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE id = ?1 AND deleted_at IS NULL",
                USER_COLUMNS
            );
            conn.query_row(&sql, [id], user_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("user", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE email = ?1 AND deleted_at IS NULL",
                USER_COLUMNS
            );
            conn.query_row(&sql, [email], user_from_row)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("user with email {}", email)))
        })
    }

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at, id",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    pub fn update_user(
        &self,
        id: i64,
        req: &UpdateUserRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        if req.is_empty() {
            return Err(StoreError::NoFieldsToUpdate);
        }
        req.validate()?;

        let mut builder = UpdateBuilder::new("users");
        builder
            .set_opt("name", req.name.clone())
            .set_opt("email", req.email.clone());
        let stmt = builder.build(id, now, USER_COLUMNS)?;

        let user = self.with_conn_mut(|conn| {
            conn.query_row(&stmt.sql, stmt.params().as_slice(), user_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("user", id))
        })?;

        info!("User {} updated", user.id);
        Ok(user)
    }

    pub fn delete_user(&self, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        self.with_conn_mut(|conn| crate::soft_delete(conn, "users", "user", id, now))?;
        info!("User {} deleted", id);
        Ok(())
    }

    pub fn count_users(&self) -> StoreResult<i64> {
        self.with_conn(|conn| crate::count_live(conn, "users"))
    }

    /// Bypasses the soft-delete filter: `None` if the row never existed,
    /// `Some(None)` while it is live.
    pub fn user_deleted_at(&self, id: i64) -> StoreResult<Option<Option<DateTime<Utc>>>> {
        self.with_conn(|conn| crate::deleted_at(conn, "users", id))
    }
}

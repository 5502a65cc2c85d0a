use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use pinboard_types::api::{CreateCategoryRequest, UpdateCategoryRequest};
use pinboard_types::models::{Category, Post, color_or_default};

use crate::posts::{POST_COLUMNS, post_from_row};
use crate::update::UpdateBuilder;
use crate::{Database, StoreError, StoreResult};

const CATEGORY_COLUMNS: &str =
    "id, name, description, color, active, created_at, updated_at, deleted_at";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

fn is_live(conn: &Connection, table: &'static str, id: i64) -> StoreResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1 AND deleted_at IS NULL", table);
    let found = conn.query_row(&sql, [id], |_| Ok(())).optional()?;
    Ok(found.is_some())
}

fn query_categories(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Vec<Category>> {
    let mut stmt = conn.prepare(sql)?;
    let categories = stmt
        .query_map(params, category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

impl Database {
    pub fn create_category(
        &self,
        req: &CreateCategoryRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        req.validate()?;
        let new = req.to_category();

        let category = self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO categories (name, description, color, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 RETURNING {}",
                CATEGORY_COLUMNS
            );
            let category = conn.query_row(
                &sql,
                params![new.name, new.description, new.color, new.active, now],
                category_from_row,
            )?;
            Ok(category)
        })?;

        info!("Category created: {} (id {})", category.name, category.id);
        Ok(category)
    }

    pub fn get_category_by_id(&self, id: i64) -> StoreResult<Category> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories WHERE id = ?1 AND deleted_at IS NULL",
                CATEGORY_COLUMNS
            );
            conn.query_row(&sql, [id], category_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("category", id))
        })
    }

    pub fn get_category_by_name(&self, name: &str) -> StoreResult<Category> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories WHERE name = ?1 AND deleted_at IS NULL",
                CATEGORY_COLUMNS
            );
            conn.query_row(&sql, [name], category_from_row)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("category named {}", name)))
        })
    }

    pub fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories WHERE deleted_at IS NULL ORDER BY created_at, id",
                CATEGORY_COLUMNS
            );
            query_categories(conn, &sql, [])
        })
    }

    pub fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories
                 WHERE active = 1 AND deleted_at IS NULL
                 ORDER BY created_at, id",
                CATEGORY_COLUMNS
            );
            query_categories(conn, &sql, [])
        })
    }

    pub fn update_category(
        &self,
        id: i64,
        req: &UpdateCategoryRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        if req.is_empty() {
            return Err(StoreError::NoFieldsToUpdate);
        }
        req.validate()?;

        let mut builder = UpdateBuilder::new("categories");
        builder
            .set_opt("name", req.name.clone())
            .set_opt("description", req.description.clone())
            .set_opt("color", req.color.as_deref().map(color_or_default))
            .set_opt("active", req.active);
        let stmt = builder.build(id, now, CATEGORY_COLUMNS)?;

        let category = self.with_conn_mut(|conn| {
            conn.query_row(&stmt.sql, stmt.params().as_slice(), category_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("category", id))
        })?;

        info!("Category {} updated", category.id);
        Ok(category)
    }

    pub fn delete_category(&self, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        self.with_conn_mut(|conn| crate::soft_delete(conn, "categories", "category", id, now))?;
        info!("Category {} deleted", id);
        Ok(())
    }

    pub fn count_categories(&self) -> StoreResult<i64> {
        self.with_conn(|conn| crate::count_live(conn, "categories"))
    }

    /// Bypasses the soft-delete filter: `None` if the row never existed,
    /// `Some(None)` while it is live.
    pub fn category_deleted_at(&self, id: i64) -> StoreResult<Option<Option<DateTime<Utc>>>> {
        self.with_conn(|conn| crate::deleted_at(conn, "categories", id))
    }

    // -- Post <-> category links --

    /// Links a post to a category. Linking twice is a no-op.
    pub fn attach_category(&self, post_id: i64, category_id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            if !is_live(conn, "posts", post_id)? {
                return Err(StoreError::not_found("post", post_id));
            }
            if !is_live(conn, "categories", category_id)? {
                return Err(StoreError::not_found("category", category_id));
            }
            conn.execute(
                "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
                [post_id, category_id],
            )?;
            Ok(())
        })?;

        info!("Post {} tagged with category {}", post_id, category_id);
        Ok(())
    }

    pub fn detach_category(&self, post_id: i64, category_id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "DELETE FROM post_categories WHERE post_id = ?1 AND category_id = ?2",
                [post_id, category_id],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!(
                    "category {} on post {}",
                    category_id, post_id
                )));
            }
            Ok(())
        })?;

        info!("Post {} untagged from category {}", post_id, category_id);
        Ok(())
    }

    pub fn list_categories_for_post(&self, post_id: i64) -> StoreResult<Vec<Category>> {
        self.with_conn(|conn| {
            if !is_live(conn, "posts", post_id)? {
                return Err(StoreError::not_found("post", post_id));
            }
            let sql = "SELECT c.id, c.name, c.description, c.color, c.active,
                              c.created_at, c.updated_at, c.deleted_at
                       FROM categories c
                       JOIN post_categories pc ON pc.category_id = c.id
                       WHERE pc.post_id = ?1 AND c.deleted_at IS NULL
                       ORDER BY c.name";
            query_categories(conn, sql, [post_id])
        })
    }

    pub fn list_posts_for_category(&self, category_id: i64) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            if !is_live(conn, "categories", category_id)? {
                return Err(StoreError::not_found("category", category_id));
            }
            let columns: Vec<String> = POST_COLUMNS
                .split(", ")
                .map(|c| format!("p.{}", c))
                .collect();
            let sql = format!(
                "SELECT {} FROM posts p
                 JOIN post_categories pc ON pc.post_id = p.id
                 WHERE pc.category_id = ?1 AND p.deleted_at IS NULL
                 ORDER BY p.created_at, p.id",
                columns.join(", ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let posts = stmt
                .query_map([category_id], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
    }

    /// Live posts linked to the category.
    pub fn count_posts_in_category(&self, category_id: i64) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM post_categories pc
                 JOIN posts p ON p.id = pc.post_id
                 WHERE pc.category_id = ?1 AND p.deleted_at IS NULL",
                [category_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

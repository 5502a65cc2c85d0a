use rusqlite::Connection;
use tracing::info;

use crate::{StoreError, StoreResult};

struct Migration {
    version: i64,
    name: &'static str,
    up: &'static str,
    down: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create users",
        up: "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            CREATE UNIQUE INDEX idx_users_email
                ON users(email) WHERE deleted_at IS NULL;
            CREATE INDEX idx_users_deleted_at ON users(deleted_at);
        ",
        down: "
            DROP INDEX IF EXISTS idx_users_deleted_at;
            DROP INDEX IF EXISTS idx_users_email;
            DROP TABLE IF EXISTS users;
        ",
    },
    Migration {
        version: 2,
        name: "create posts",
        up: "
            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                content     TEXT NOT NULL DEFAULT '',
                published   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            CREATE INDEX idx_posts_user ON posts(user_id, created_at);
            CREATE INDEX idx_posts_deleted_at ON posts(deleted_at);
        ",
        down: "
            DROP INDEX IF EXISTS idx_posts_deleted_at;
            DROP INDEX IF EXISTS idx_posts_user;
            DROP TABLE IF EXISTS posts;
        ",
    },
    Migration {
        version: 3,
        name: "create categories",
        up: "
            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                color       TEXT NOT NULL DEFAULT '#007bff',
                active      INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            CREATE UNIQUE INDEX idx_categories_name
                ON categories(name) WHERE deleted_at IS NULL;
            CREATE INDEX idx_categories_deleted_at ON categories(deleted_at);

            CREATE TABLE post_categories (
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, category_id)
            );

            CREATE INDEX idx_post_categories_category ON post_categories(category_id);
        ",
        down: "
            DROP INDEX IF EXISTS idx_post_categories_category;
            DROP TABLE IF EXISTS post_categories;
            DROP INDEX IF EXISTS idx_categories_deleted_at;
            DROP INDEX IF EXISTS idx_categories_name;
            DROP TABLE IF EXISTS categories;
        ",
    },
];

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

fn ensure_version_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;
    Ok(())
}

pub fn current_version(conn: &Connection) -> StoreResult<i64> {
    ensure_version_table(conn)?;
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Applies every pending migration, each in its own transaction.
/// Returns the resulting schema version.
pub fn run(conn: &Connection) -> StoreResult<i64> {
    let start = current_version(conn)?;
    let mut version = start;

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        info!("Running migration v{} ({})", migration.version, migration.name);

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up).map_err(|e| {
            StoreError::Migration(format!("v{} {}: {}", migration.version, migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )?;
        tx.commit()?;

        version = migration.version;
    }

    info!("Database migrations complete (schema v{})", version);
    Ok(version)
}

/// Reverts the most recent migration. Returns the version that was rolled
/// back, or `None` on an empty schema.
pub fn rollback(conn: &Connection) -> StoreResult<Option<i64>> {
    let version = current_version(conn)?;
    let Some(migration) = MIGRATIONS.iter().find(|m| m.version == version) else {
        return Ok(None);
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.down).map_err(|e| {
        StoreError::Migration(format!("rollback v{}: {}", migration.version, e))
    })?;
    tx.execute("DELETE FROM schema_version WHERE version = ?1", [version])?;
    tx.commit()?;

    info!("Rolled back migration v{} ({})", migration.version, migration.name);
    Ok(Some(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |r| r.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run(&conn).unwrap(), latest_version());
        assert_eq!(run(&conn).unwrap(), latest_version());

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, latest_version());
    }

    #[test]
    fn rollback_reverts_latest_step() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        assert!(table_exists(&conn, "categories"));

        assert_eq!(rollback(&conn).unwrap(), Some(3));
        assert!(!table_exists(&conn, "categories"));
        assert!(!table_exists(&conn, "post_categories"));
        assert!(table_exists(&conn, "posts"));
        assert_eq!(current_version(&conn).unwrap(), 2);

        // Re-applying restores the dropped step only.
        assert_eq!(run(&conn).unwrap(), 3);
        assert!(table_exists(&conn, "categories"));
    }

    #[test]
    fn rollback_on_empty_schema_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(rollback(&conn).unwrap(), None);
        assert_eq!(current_version(&conn).unwrap(), 0);
    }
}

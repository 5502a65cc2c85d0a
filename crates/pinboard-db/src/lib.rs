pub mod categories;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod posts;
pub mod update;
pub mod users;

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::info;

pub use error::{StoreError, StoreResult};
pub use memory::MessageStore;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Read-only connections handed out round-robin by `with_conn`.
    pub reader_pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pinboard.db"),
            reader_pool_size: 4,
        }
    }
}

/// SQLite-backed blog store with a reader/writer split.
///
/// Every repository call is a single autocommit statement; the writer
/// connection serializes mutations.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(config: &DatabaseConfig) -> StoreResult<Self> {
        let writer = Connection::open(&config.path)?;
        configure(&writer)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(config.reader_pool_size);
        for _ in 0..config.reader_pool_size {
            let conn = Connection::open_with_flags(
                &config.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(Duration::from_secs(5))?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            config.path.display(),
            readers.len()
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Single shared connection; reads and writes both go through the writer.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        migrations::run(&conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(f);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    pub fn schema_version(&self) -> StoreResult<i64> {
        self.with_conn_mut(|conn| migrations::current_version(conn))
    }
}

fn configure(conn: &Connection) -> StoreResult<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

// -- Soft delete helpers shared by the repositories --

/// Marks a live row deleted. Zero affected rows means it was missing or
/// already deleted.
fn soft_delete(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let sql = format!(
        "UPDATE {} SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        table
    );
    let affected = conn.execute(&sql, rusqlite::params![now, id])?;
    if affected == 0 {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

/// Looks a row up regardless of its soft-delete state.
///
/// `None` when the row never existed, `Some(None)` when it is live.
fn deleted_at(
    conn: &Connection,
    table: &'static str,
    id: i64,
) -> StoreResult<Option<Option<DateTime<Utc>>>> {
    let sql = format!("SELECT deleted_at FROM {} WHERE id = ?1", table);
    let row = conn
        .query_row(&sql, [id], |row| row.get::<_, Option<DateTime<Utc>>>(0))
        .optional()?;
    Ok(row)
}

fn count_live(conn: &Connection, table: &'static str) -> StoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL", table);
    let count = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}

use pinboard_types::ValidationError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unique or foreign-key constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound(format!("{} {}", entity, id))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, ref msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(msg.clone().unwrap_or_else(|| code.to_string()))
            }
            other => Self::Sqlite(other),
        }
    }
}

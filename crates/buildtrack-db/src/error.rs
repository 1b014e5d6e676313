//! Database error types.

use buildtrack_core::BuildId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: build {0}")]
    NotFound(BuildId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<DbError> for buildtrack_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(id) => buildtrack_core::Error::NotFound(id),
            DbError::Conflict(msg) => buildtrack_core::Error::Conflict(msg),
            other => buildtrack_core::Error::Store(other.to_string()),
        }
    }
}

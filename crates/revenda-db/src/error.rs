//! # Database Error Types
//!
//! ```text
//! sqlx::Error ─────────┐
//! MigrateError ────────┼──► DbError ──► CartStore: warn!, keep going
//! serde_json::Error ───┘              └► ApiError (DATABASE_ERROR)
//! ```

use thiserror::Error;

/// Local storage failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// The file could not be opened or created.
    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection freed up in time, or the file stayed locked.
    #[error("Database is busy")]
    Busy,

    /// A stored value no longer decodes, e.g. written by an incompatible
    /// version or edited by hand.
    #[error("Invalid stored value for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::Database(db_err) => {
                // SQLITE_BUSY / SQLITE_LOCKED after busy_timeout ran out
                if matches!(db_err.code().as_deref(), Some("5") | Some("6")) {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("database is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

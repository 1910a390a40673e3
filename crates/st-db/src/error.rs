//! Error types for st-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {message}\n  statement: {sql}")]
    ExecutionError { message: String, sql: String },

    /// URL scheme not handled by any backend (D003)
    #[error("[D003] Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    /// BEGIN/COMMIT/ROLLBACK failed (D004)
    #[error("[D004] Transaction {action} failed: {message}")]
    TransactionError {
        action: &'static str,
        message: String,
    },

    /// Lock query failed (D005)
    #[error("[D005] Migration lock '{key}' failed: {message}")]
    LockError { key: String, message: String },

    /// Internal error (D006)
    #[error("[D006] Internal database error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub(crate) fn execution(err: sqlx::Error, sql: &str) -> Self {
        DbError::ExecutionError {
            message: err.to_string(),
            sql: sql.to_string(),
        }
    }

    pub(crate) fn lock(err: sqlx::Error, key: &str) -> Self {
        DbError::LockError {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

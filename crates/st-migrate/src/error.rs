//! Error types for the migration engine.

use st_core::{CoreError, Dialect};
use st_db::DbError;
use st_sql::SqlError;
use thiserror::Error;

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Malformed migration rejected before anything runs (M001).
    #[error("[M001] Invalid migration configuration: {0}")]
    Configuration(String),

    /// No SQL variant for the active dialect (M002).
    #[error("[M002] No SQL for dialect {dialect}: {context}")]
    UnsupportedDialect { dialect: Dialect, context: String },

    /// Statement rejected or precondition on data not met (M003).
    #[error("[M003] Migration execution failed: {0}")]
    Execution(String),

    /// Driver error with preserved source chain (M004).
    #[error("[M004] {0}")]
    Database(#[from] DbError),

    /// Another process holds the migration lock (M005).
    #[error("[M005] Could not acquire migration lock '{key}' within {waited_secs}s")]
    LockAcquisition { key: String, waited_secs: u64 },

    /// Target structure already exists or is missing (M006).
    #[error("[M006] Schema conflict: {0}")]
    SchemaConflict(String),

    /// Ledger table could not be read or written (M007).
    #[error("[M007] Migration ledger error: {0}")]
    Ledger(String),

    /// A step failed; the run stopped there (M008).
    #[error("[M008] Migration '{name}' failed: {source}")]
    MigrationFailed {
        name: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Definition file could not be read or parsed (M009).
    #[error("[M009] Invalid migration file {path}: {message}")]
    Definition { path: String, message: String },
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// Returns true for errors raised while executing statements, whether
    /// detected by the engine or reported by the driver.
    pub fn is_execution(&self) -> bool {
        match self {
            MigrateError::Execution(_) => true,
            MigrateError::Database(DbError::ExecutionError { .. }) => true,
            MigrateError::MigrationFailed { source, .. } => source.is_execution(),
            _ => false,
        }
    }

    /// The innermost cause of a failed run.
    pub fn root(&self) -> &MigrateError {
        match self {
            MigrateError::MigrationFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<CoreError> for MigrateError {
    fn from(err: CoreError) -> Self {
        MigrateError::Configuration(err.to_string())
    }
}

impl From<SqlError> for MigrateError {
    fn from(err: SqlError) -> Self {
        match err {
            SqlError::UnsupportedDialect { dialect, context } => {
                MigrateError::UnsupportedDialect { dialect, context }
            }
            other => MigrateError::Configuration(other.to_string()),
        }
    }
}

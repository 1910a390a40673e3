//! Error types for st-sql

use st_core::Dialect;
use thiserror::Error;

/// Dialect rendering errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// No SQL variant registered for the active dialect (S001)
    #[error("[S001] No SQL variant for dialect '{dialect}': {context}")]
    UnsupportedDialect { dialect: Dialect, context: String },

    /// Rendered or supplied SQL does not parse (S002)
    #[error("[S002] SQL parse error ({dialect}): {message}")]
    ParseError { dialect: Dialect, message: String },

    /// Descriptor cannot be rendered (S003)
    #[error("[S003] Cannot render '{table}': {message}")]
    InvalidDescriptor { table: String, message: String },
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;

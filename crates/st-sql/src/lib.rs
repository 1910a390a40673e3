//! st-sql - Dialect adapter for Strata
//!
//! Renders dialect-neutral table, column, and index descriptors into DDL for
//! the SQLite, Postgres, and MySQL families, and selects per-dialect raw SQL
//! supplied inline by migration authors.

pub mod dialect;
pub mod error;
pub mod raw;

pub use dialect::{dialect_for, MysqlDialect, PostgresDialect, SqlDialect, SqliteDialect};
pub use error::{SqlError, SqlResult};
pub use raw::RawSqlVariants;

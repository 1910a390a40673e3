//! st-db - Database connections for Strata
//!
//! This crate provides the `Database` trait family and sqlx-backed
//! implementations for SQLite, Postgres and MySQL.

#[macro_use]
mod backend;
pub mod connect;
pub mod error;
pub mod mysql;
pub mod postgres;
pub(crate) mod row_helpers;
pub mod sqlite;
pub mod traits;

pub use connect::{connect, connect_config};
pub use error::{DbError, DbResult};
pub use mysql::MysqlBackend;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;
pub use traits::{Database, DatabaseCore, DatabaseLock, DatabaseSchema, DatabaseTransaction};

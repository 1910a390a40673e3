//! st-core - Core library for Strata
//!
//! This crate provides the dialect-neutral schema descriptors, the dialect
//! tag, strongly-typed names, and project configuration shared by every
//! other Strata crate.

pub mod config;
pub mod dialect;
pub mod error;
pub mod migration_name;
mod newtype_string;
pub mod schema;
pub mod table_name;

pub use config::{Config, DatabaseConfig, LockConfig};
pub use dialect::Dialect;
pub use error::{CoreError, CoreResult};
pub use migration_name::MigrationName;
pub use schema::{ColumnDescriptor, ColumnType, IndexDescriptor, TableDescriptor};
pub use table_name::TableName;

//! Database trait definitions
//!
//! The capabilities are split into focused traits; `Database` is the
//! combination every backend implements and what callers hold as
//! `Box<dyn Database>`.

use crate::error::DbResult;
use async_trait::async_trait;
use st_core::Dialect;

/// Statement execution and result reading
#[async_trait]
pub trait DatabaseCore: Send + Sync {
    /// SQL family spoken by this connection
    fn dialect(&self) -> Dialect;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<u64>;

    /// Execute one or more `;`-separated statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Number of rows produced by `sql`
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// All rows of `sql`, each cell rendered as text (`None` for NULL)
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>>;
}

/// Catalog introspection used for resume checks
#[async_trait]
pub trait DatabaseSchema: Send + Sync {
    /// Check if a table exists in the current schema
    async fn relation_exists(&self, table: &str) -> DbResult<bool>;

    /// Check if `table` has a column named `column`
    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool>;

    /// Check if `table` has an index named `index`
    async fn index_exists(&self, table: &str, index: &str) -> DbResult<bool>;
}

/// Explicit transaction control on the single underlying connection
#[async_trait]
pub trait DatabaseTransaction: Send + Sync {
    async fn begin(&self) -> DbResult<()>;

    async fn commit(&self) -> DbResult<()>;

    async fn rollback(&self) -> DbResult<()>;
}

/// Cross-process exclusion for migration runs
#[async_trait]
pub trait DatabaseLock: Send + Sync {
    /// Try once to take the lock named `key`. Returns false if another
    /// session holds it.
    async fn try_lock(&self, key: &str) -> DbResult<bool>;

    /// Release a lock taken by this connection
    async fn unlock(&self, key: &str) -> DbResult<()>;

    /// Clear the lock regardless of owner. Returns true if something was
    /// released.
    async fn force_unlock(&self, key: &str) -> DbResult<bool>;
}

/// Full backend surface
pub trait Database: DatabaseCore + DatabaseSchema + DatabaseTransaction + DatabaseLock {}

impl<T> Database for T where T: DatabaseCore + DatabaseSchema + DatabaseTransaction + DatabaseLock {}

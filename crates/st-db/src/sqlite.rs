//! SQLite backend

use crate::error::{DbError, DbResult};
use crate::traits::{DatabaseLock, DatabaseSchema};
use async_trait::async_trait;
use sqlx::{Connection, SqliteConnection};
use st_core::Dialect;
use tokio::sync::Mutex;

/// Table holding one row per held migration lock
pub const LOCK_TABLE: &str = "strata_migration_lock";

/// SQLite database backend
pub struct SqliteBackend {
    conn: Mutex<SqliteConnection>,
    owner: String,
}

impl SqliteBackend {
    /// Open a connection from a `sqlite:` URL
    pub async fn connect(url: &str) -> DbResult<Self> {
        let conn = SqliteConnection::connect(url)
            .await
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", url, e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
            owner: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Create a new in-memory SQLite database
    pub async fn in_memory() -> DbResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Owner token written into lock rows taken by this connection
    pub fn owner(&self) -> &str {
        &self.owner
    }

    async fn count_bound(&self, sql: &str, binds: &[&str]) -> DbResult<i64> {
        let mut conn = self.conn.lock().await;
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        query
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| DbError::execution(e, sql))
    }

    async fn ensure_lock_table(&self, key: &str) -> DbResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (lock_key TEXT PRIMARY KEY NOT NULL, owner TEXT NOT NULL, acquired_at TEXT NOT NULL)",
            LOCK_TABLE
        );
        let mut conn = self.conn.lock().await;
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&sql))
            .await
            .map_err(|e| DbError::lock(e, key))?;
        Ok(())
    }
}

impl_sqlx_backend!(SqliteBackend, Dialect::Sqlite, "sqlite", begin = "BEGIN");

#[async_trait]
impl DatabaseSchema for SqliteBackend {
    async fn relation_exists(&self, table: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[table],
            )
            .await?;
        Ok(count > 0)
    }

    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
                &[table, column],
            )
            .await?;
        Ok(count > 0)
    }

    async fn index_exists(&self, table: &str, index: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND name = ?",
                &[table, index],
            )
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl DatabaseLock for SqliteBackend {
    async fn try_lock(&self, key: &str) -> DbResult<bool> {
        self.ensure_lock_table(key).await?;

        let mut conn = self.conn.lock().await;
        let insert = format!(
            "INSERT OR IGNORE INTO {} (lock_key, owner, acquired_at) VALUES (?, ?, datetime('now'))",
            LOCK_TABLE
        );
        sqlx::Executor::execute(&mut *conn, sqlx::query(&insert).bind(key).bind(&self.owner))
            .await
            .map_err(|e| DbError::lock(e, key))?;

        let select = format!("SELECT owner FROM {} WHERE lock_key = ?", LOCK_TABLE);
        let holder: Option<String> = sqlx::query_scalar(&select)
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DbError::lock(e, key))?;
        Ok(holder.as_deref() == Some(self.owner.as_str()))
    }

    async fn unlock(&self, key: &str) -> DbResult<()> {
        self.ensure_lock_table(key).await?;
        let mut conn = self.conn.lock().await;
        let sql = format!(
            "DELETE FROM {} WHERE lock_key = ? AND owner = ?",
            LOCK_TABLE
        );
        sqlx::Executor::execute(&mut *conn, sqlx::query(&sql).bind(key).bind(&self.owner))
            .await
            .map_err(|e| DbError::lock(e, key))?;
        Ok(())
    }

    async fn force_unlock(&self, key: &str) -> DbResult<bool> {
        self.ensure_lock_table(key).await?;
        let mut conn = self.conn.lock().await;
        let sql = format!("DELETE FROM {} WHERE lock_key = ?", LOCK_TABLE);
        let done = sqlx::Executor::execute(&mut *conn, sqlx::query(&sql).bind(key))
            .await
            .map_err(|e| DbError::lock(e, key))?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

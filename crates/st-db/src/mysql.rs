//! MySQL / MariaDB backend

use crate::error::{DbError, DbResult};
use crate::traits::{DatabaseLock, DatabaseSchema};
use async_trait::async_trait;
use sqlx::{Connection, MySqlConnection};
use st_core::Dialect;
use tokio::sync::Mutex;

/// MySQL database backend
///
/// DDL commits implicitly on MySQL. Callers open a transaction only around
/// steps that write rows, so START TRANSACTION/COMMIT bracket data
/// statements and the ledger insert that follows them.
pub struct MysqlBackend {
    conn: Mutex<MySqlConnection>,
}

impl MysqlBackend {
    /// Open a connection from a `mysql:` URL (`mariadb:` is rewritten)
    pub async fn connect(url: &str) -> DbResult<Self> {
        let url = match url.strip_prefix("mariadb:") {
            Some(rest) => format!("mysql:{}", rest),
            None => url.to_string(),
        };
        let conn = MySqlConnection::connect(&url)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
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

    async fn lock_query(&self, sql: &str, key: &str) -> DbResult<Option<i64>> {
        let mut conn = self.conn.lock().await;
        sqlx::query_scalar::<_, Option<i64>>(sql)
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| DbError::lock(e, key))
    }
}

impl_sqlx_backend!(
    MysqlBackend,
    Dialect::Mysql,
    "mysql",
    begin = "START TRANSACTION"
);

#[async_trait]
impl DatabaseSchema for MysqlBackend {
    async fn relation_exists(&self, table: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
                &[table],
            )
            .await?;
        Ok(count > 0)
    }

    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?",
                &[table, column],
            )
            .await?;
        Ok(count > 0)
    }

    async fn index_exists(&self, table: &str, index: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM information_schema.statistics WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?",
                &[table, index],
            )
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl DatabaseLock for MysqlBackend {
    async fn try_lock(&self, key: &str) -> DbResult<bool> {
        let acquired = self
            .lock_query("SELECT CAST(GET_LOCK(?, 0) AS SIGNED)", key)
            .await?;
        Ok(acquired == Some(1))
    }

    async fn unlock(&self, key: &str) -> DbResult<()> {
        let released = self
            .lock_query("SELECT CAST(RELEASE_LOCK(?) AS SIGNED)", key)
            .await?;
        if released != Some(1) {
            log::warn!("named lock '{}' was not held by this session", key);
        }
        Ok(())
    }

    async fn force_unlock(&self, key: &str) -> DbResult<bool> {
        let holder = self
            .lock_query("SELECT CAST(IS_USED_LOCK(?) AS SIGNED)", key)
            .await?;
        let Some(holder) = holder else {
            return Ok(false);
        };
        let sql = format!("KILL {}", holder);
        let mut conn = self.conn.lock().await;
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&sql))
            .await
            .map_err(|e| DbError::lock(e, key))?;
        Ok(true)
    }
}

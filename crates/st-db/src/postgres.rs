//! Postgres backend

use crate::error::{DbError, DbResult};
use crate::traits::{DatabaseLock, DatabaseSchema};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Connection, PgConnection};
use st_core::Dialect;
use tokio::sync::Mutex;

/// Postgres database backend
pub struct PostgresBackend {
    conn: Mutex<PgConnection>,
}

/// Session advisory lock key for a lock name: the first eight bytes of its
/// SHA-256 digest, big-endian.
pub fn advisory_key(name: &str) -> i64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

impl PostgresBackend {
    /// Open a connection from a `postgres:` URL
    pub async fn connect(url: &str) -> DbResult<Self> {
        let conn = PgConnection::connect(url)
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

    async fn lock_query(&self, sql: &str, key: &str) -> DbResult<bool> {
        let mut conn = self.conn.lock().await;
        sqlx::query_scalar::<_, bool>(sql)
            .bind(advisory_key(key))
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| DbError::lock(e, key))
    }
}

impl_sqlx_backend!(
    PostgresBackend,
    Dialect::Postgres,
    "postgres",
    begin = "BEGIN"
);

#[async_trait]
impl DatabaseSchema for PostgresBackend {
    async fn relation_exists(&self, table: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name::text = $1",
                &[table],
            )
            .await?;
        Ok(count > 0)
    }

    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = current_schema() AND table_name::text = $1 AND column_name::text = $2",
                &[table, column],
            )
            .await?;
        Ok(count > 0)
    }

    async fn index_exists(&self, table: &str, index: &str) -> DbResult<bool> {
        let count = self
            .count_bound(
                "SELECT COUNT(*) FROM pg_indexes WHERE schemaname = current_schema() AND tablename::text = $1 AND indexname::text = $2",
                &[table, index],
            )
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl DatabaseLock for PostgresBackend {
    async fn try_lock(&self, key: &str) -> DbResult<bool> {
        self.lock_query("SELECT pg_try_advisory_lock($1)", key)
            .await
    }

    async fn unlock(&self, key: &str) -> DbResult<()> {
        let released = self
            .lock_query("SELECT pg_advisory_unlock($1)", key)
            .await?;
        if !released {
            log::warn!("advisory lock '{}' was not held by this session", key);
        }
        Ok(())
    }

    async fn force_unlock(&self, key: &str) -> DbResult<bool> {
        // Advisory locks live with the holding session, so the holder has
        // to be terminated.
        self.lock_query(
            "SELECT COALESCE(bool_or(pg_terminate_backend(pid)), false) FROM pg_locks \
             WHERE locktype = 'advisory' AND pid <> pg_backend_pid() \
             AND ((classid::bigint << 32) | objid::bigint) = $1",
            key,
        )
        .await
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;

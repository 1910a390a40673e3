//! Statement execution shared by every sqlx backend.
//!
//! Each backend wraps one connection in a `tokio::sync::Mutex` so that
//! explicit BEGIN/COMMIT pairs always land on the same session.

/// Implements `DatabaseCore` and `DatabaseTransaction` for a backend struct
/// with a `conn: tokio::sync::Mutex<Connection>` field.
macro_rules! impl_sqlx_backend {
    ($backend:ty, $dialect:expr, $db_type:literal, begin = $begin:literal) => {
        #[async_trait::async_trait]
        impl $crate::traits::DatabaseCore for $backend {
            fn dialect(&self) -> st_core::Dialect {
                $dialect
            }

            fn db_type(&self) -> &'static str {
                $db_type
            }

            async fn execute(&self, sql: &str) -> $crate::error::DbResult<u64> {
                log::debug!("[{}] {}", $db_type, sql);
                let mut conn = self.conn.lock().await;
                let done = sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql))
                    .await
                    .map_err(|e| $crate::error::DbError::execution(e, sql))?;
                Ok(done.rows_affected())
            }

            async fn execute_batch(&self, sql: &str) -> $crate::error::DbResult<()> {
                self.execute(sql).await.map(|_| ())
            }

            async fn query_count(&self, sql: &str) -> $crate::error::DbResult<usize> {
                let wrapped = format!("SELECT COUNT(*) FROM ({}) AS strata_count", sql);
                let mut conn = self.conn.lock().await;
                let count: i64 = sqlx::query_scalar(&wrapped)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|e| $crate::error::DbError::execution(e, &wrapped))?;
                Ok(count as usize)
            }

            async fn query_rows(
                &self,
                sql: &str,
            ) -> $crate::error::DbResult<Vec<Vec<Option<String>>>> {
                use sqlx::Row;

                let mut conn = self.conn.lock().await;
                let rows = sqlx::query(sql)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| $crate::error::DbError::execution(e, sql))?;
                Ok(rows
                    .iter()
                    .map(|row| {
                        (0..row.len())
                            .map(|i| $crate::row_helpers::get_column_as_string(row, i))
                            .collect()
                    })
                    .collect())
            }
        }

        #[async_trait::async_trait]
        impl $crate::traits::DatabaseTransaction for $backend {
            async fn begin(&self) -> $crate::error::DbResult<()> {
                self.transaction_statement("begin", $begin).await
            }

            async fn commit(&self) -> $crate::error::DbResult<()> {
                self.transaction_statement("commit", "COMMIT").await
            }

            async fn rollback(&self) -> $crate::error::DbResult<()> {
                self.transaction_statement("rollback", "ROLLBACK").await
            }
        }

        impl $backend {
            async fn transaction_statement(
                &self,
                action: &'static str,
                sql: &str,
            ) -> $crate::error::DbResult<()> {
                log::debug!("[{}] {}", $db_type, sql);
                let mut conn = self.conn.lock().await;
                sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql))
                    .await
                    .map_err(|e| $crate::error::DbError::TransactionError {
                        action,
                        message: e.to_string(),
                    })?;
                Ok(())
            }
        }
    };
}

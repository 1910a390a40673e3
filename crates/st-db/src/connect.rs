//! Open a backend for a configured URL

use crate::error::{DbError, DbResult};
use crate::mysql::MysqlBackend;
use crate::postgres::PostgresBackend;
use crate::sqlite::SqliteBackend;
use crate::traits::Database;
use st_core::{DatabaseConfig, Dialect};

/// Connect to `url` using the backend for `dialect`.
pub async fn connect(url: &str, dialect: Dialect) -> DbResult<Box<dyn Database>> {
    let inferred = Dialect::from_url(url).map_err(|_| DbError::UnsupportedUrl(url.to_string()))?;
    if inferred != dialect {
        return Err(DbError::UnsupportedUrl(format!(
            "{} is a {} URL but the {} dialect was requested",
            url, inferred, dialect
        )));
    }

    log::debug!("Connecting to {} database", dialect);
    let db: Box<dyn Database> = match dialect {
        Dialect::Sqlite => Box::new(SqliteBackend::connect(url).await?),
        Dialect::Postgres => Box::new(PostgresBackend::connect(url).await?),
        Dialect::Mysql => Box::new(MysqlBackend::connect(url).await?),
    };
    Ok(db)
}

/// Connect using a resolved database config block
pub async fn connect_config(config: &DatabaseConfig) -> DbResult<Box<dyn Database>> {
    let dialect = config
        .dialect()
        .map_err(|e| DbError::UnsupportedUrl(e.to_string()))?;
    connect(&config.url, dialect).await
}

#[cfg(test)]
#[path = "connect_test.rs"]
mod tests;

//! Raw SQL supplied per dialect by migration authors.

use serde::{Deserialize, Serialize};
use st_core::Dialect;
use std::collections::BTreeMap;

use crate::dialect::SqlDialect;
use crate::error::{SqlError, SqlResult};

/// Literal SQL text keyed by dialect.
///
/// Exactly one entry is selected at execution time. An entry set to `None`
/// (YAML `null`) is an explicit no-op for that dialect; a dialect with no
/// entry falls back to `fallback`, and without a fallback it is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSqlVariants {
    /// SQL used when the active dialect has no entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,

    #[serde(flatten)]
    variants: BTreeMap<Dialect, Option<String>>,
}

impl RawSqlVariants {
    /// Empty variant set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register SQL for `dialect`
    pub fn variant(mut self, dialect: Dialect, sql: impl Into<String>) -> Self {
        self.variants.insert(dialect, Some(sql.into()));
        self
    }

    /// Register SQL for SQLite
    pub fn sqlite(self, sql: impl Into<String>) -> Self {
        self.variant(Dialect::Sqlite, sql)
    }

    /// Register SQL for Postgres
    pub fn postgres(self, sql: impl Into<String>) -> Self {
        self.variant(Dialect::Postgres, sql)
    }

    /// Register SQL for MySQL
    pub fn mysql(self, sql: impl Into<String>) -> Self {
        self.variant(Dialect::Mysql, sql)
    }

    /// Declare that nothing runs on `dialect`
    pub fn skip(mut self, dialect: Dialect) -> Self {
        self.variants.insert(dialect, None);
        self
    }

    /// SQL for every dialect without its own entry
    pub fn with_fallback(mut self, sql: impl Into<String>) -> Self {
        self.fallback = Some(sql.into());
        self
    }

    /// Returns true if no variant and no fallback is registered
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty() && self.fallback.is_none()
    }

    /// Returns true if `dialect` resolves without error
    pub fn covers(&self, dialect: Dialect) -> bool {
        self.variants.contains_key(&dialect) || self.fallback.is_some()
    }

    /// Select the text for `dialect`.
    ///
    /// `Ok(None)` means the migration author declared an explicit no-op.
    pub fn resolve(&self, dialect: Dialect) -> SqlResult<Option<&str>> {
        match self.variants.get(&dialect) {
            Some(entry) => Ok(entry.as_deref()),
            None => match &self.fallback {
                Some(sql) => Ok(Some(sql.as_str())),
                None => Err(SqlError::UnsupportedDialect {
                    dialect,
                    context: format!(
                        "registered variants: [{}] and no fallback",
                        self.variants
                            .keys()
                            .map(Dialect::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }),
            },
        }
    }

    /// Select and normalise the text for the adapter's dialect.
    pub fn render(&self, adapter: &dyn SqlDialect) -> SqlResult<Option<String>> {
        Ok(self
            .resolve(adapter.dialect())?
            .map(|sql| adapter.normalize_raw(sql)))
    }
}

#[cfg(test)]
#[path = "raw_test.rs"]
mod tests;

//! Record of applied migrations, stored in the target database.

use crate::error::{MigrateError, MigrateResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use st_core::{ColumnDescriptor, ColumnType, IndexDescriptor, TableDescriptor, TableName};
use st_db::Database;
use st_sql::SqlDialect;
use std::collections::HashSet;

/// Ledger table used when none is configured
pub const DEFAULT_LEDGER_TABLE: &str = "migration_log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub name: String,
    pub applied_at: DateTime<Utc>,
    /// Statements executed for the step; empty for no-ops and resumed stages
    pub sql: String,
}

/// Reads and appends ledger rows. Rows are never updated or deleted.
pub struct Ledger<'a> {
    db: &'a dyn Database,
    dialect: &'a dyn SqlDialect,
    table: TableName,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a dyn Database, dialect: &'a dyn SqlDialect, table: TableName) -> Self {
        Self { db, dialect, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Shape of a ledger table named `table`.
    pub fn descriptor_for(table: &TableName) -> TableDescriptor {
        TableDescriptor {
            name: table.clone(),
            columns: vec![
                ColumnDescriptor::new("id", ColumnType::BigInt).auto_increment(),
                ColumnDescriptor::new("migration_id", ColumnType::Varchar(255)),
                ColumnDescriptor::new("sql", ColumnType::Text).nullable(),
                ColumnDescriptor::new("applied_at", ColumnType::DateTime),
            ],
            indices: vec![IndexDescriptor::unique(["migration_id"])],
        }
    }

    async fn exists(&self) -> MigrateResult<bool> {
        self.db
            .relation_exists(&self.table)
            .await
            .map_err(|e| MigrateError::Ledger(e.to_string()))
    }

    /// Create the ledger table and its unique index if absent.
    pub async fn ensure(&self) -> MigrateResult<()> {
        if self.exists().await? {
            return Ok(());
        }
        log::debug!("Creating migration ledger {}", self.table);
        let descriptor = Self::descriptor_for(&self.table);
        for sql in self.dialect.create_table_sql(&descriptor, false) {
            self.db
                .execute(&sql)
                .await
                .map_err(|e| MigrateError::Ledger(e.to_string()))?;
        }
        Ok(())
    }

    /// Whether `name` has a ledger row.
    pub async fn is_applied(&self, name: &str) -> MigrateResult<bool> {
        if !self.exists().await? {
            return Ok(false);
        }
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = {}",
            self.dialect.quote_ident(&self.table),
            self.dialect.quote_ident("migration_id"),
            self.dialect.quote_literal(name)
        );
        let count = self
            .db
            .query_count(&sql)
            .await
            .map_err(|e| MigrateError::Ledger(e.to_string()))?;
        Ok(count > 0)
    }

    /// Names of every applied migration. Empty if the ledger does not exist.
    pub async fn applied_names(&self) -> MigrateResult<HashSet<String>> {
        Ok(self.entries().await?.into_iter().map(|e| e.name).collect())
    }

    /// All ledger rows in application order.
    pub async fn entries(&self) -> MigrateResult<Vec<LedgerEntry>> {
        if !self.exists().await? {
            return Ok(Vec::new());
        }
        let q = |c: &str| self.dialect.quote_ident(c);
        let sql = format!(
            "SELECT {}, {}, {} FROM {} ORDER BY {}",
            q("migration_id"),
            self.dialect.cast_to_text(&q("applied_at")),
            q("sql"),
            q(&self.table),
            q("id")
        );
        let rows = self
            .db
            .query_rows(&sql)
            .await
            .map_err(|e| MigrateError::Ledger(e.to_string()))?;

        rows.into_iter().map(parse_entry).collect()
    }

    /// Append a row for `name`.
    pub async fn record_applied(
        &self,
        name: &str,
        applied_at: DateTime<Utc>,
        sql: &str,
    ) -> MigrateResult<()> {
        let q = |c: &str| self.dialect.quote_ident(c);
        let insert = format!(
            "INSERT INTO {} ({}, {}, {}) VALUES ({}, {}, {})",
            q(&self.table),
            q("migration_id"),
            q("sql"),
            q("applied_at"),
            self.dialect.quote_literal(name),
            self.dialect.quote_literal(sql),
            self.dialect
                .quote_literal(&applied_at.format(TIMESTAMP_FORMAT).to_string())
        );
        self.db
            .execute(&insert)
            .await
            .map_err(|e| MigrateError::Ledger(format!("recording '{}': {}", name, e)))?;
        Ok(())
    }
}

fn parse_entry(row: Vec<Option<String>>) -> MigrateResult<LedgerEntry> {
    let mut cells = row.into_iter();
    let name = cells
        .next()
        .flatten()
        .ok_or_else(|| MigrateError::Ledger("ledger row without migration_id".to_string()))?;
    let applied = cells.next().flatten().unwrap_or_default();
    let sql = cells.next().flatten().unwrap_or_default();

    // Drivers may append fractional seconds; the stored value has none.
    let trimmed = applied.split('.').next().unwrap_or_default();
    let applied_at = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .map_err(|e| {
            MigrateError::Ledger(format!(
                "bad applied_at '{}' for '{}': {}",
                applied, name, e
            ))
        })?
        .and_utc();

    Ok(LedgerEntry {
        name,
        applied_at,
        sql,
    })
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;

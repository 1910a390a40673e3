//! The plain schema-change operations.

use crate::error::{MigrateError, MigrateResult};
use crate::step::{StepContext, StepOperation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use st_core::schema::{validate_column, validate_index};
use st_core::{ColumnDescriptor, Dialect, IndexDescriptor, TableDescriptor, TableName};
use st_sql::{RawSqlVariants, SqlDialect};

/// What to do when the structure a step creates is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
    /// Raise a schema conflict
    #[default]
    Fail,
    /// Treat the step as done; used by resumable replace stages
    Skip,
}

impl OnExisting {
    fn resolve(self, what: String) -> MigrateResult<Vec<String>> {
        match self {
            OnExisting::Fail => Err(MigrateError::SchemaConflict(format!(
                "{} already exists",
                what
            ))),
            OnExisting::Skip => {
                log::debug!("{} already exists, skipping", what);
                Ok(Vec::new())
            }
        }
    }
}

fn missing(what: String) -> MigrateError {
    MigrateError::SchemaConflict(format!("{} does not exist", what))
}

/// Create a table together with its declared indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub table: TableDescriptor,
    #[serde(skip)]
    pub on_existing: OnExisting,
}

impl CreateTable {
    pub fn new(table: TableDescriptor) -> Self {
        Self {
            table,
            on_existing: OnExisting::Fail,
        }
    }

    pub fn on_existing(mut self, on_existing: OnExisting) -> Self {
        self.on_existing = on_existing;
        self
    }
}

#[async_trait]
impl StepOperation for CreateTable {
    fn describe(&self) -> String {
        format!("create table {}", self.table.name)
    }

    fn validate(&self) -> MigrateResult<()> {
        Ok(self.table.validate()?)
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(dialect.create_table_sql(&self.table, false))
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        if ctx.db.relation_exists(&self.table.name).await? {
            return self
                .on_existing
                .resolve(format!("table {}", self.table.name));
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

/// Add one column to an existing table.
///
/// NOT NULL columns without a default receive the dialect's zero value so
/// existing rows stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddColumn {
    pub table: TableName,
    pub column: ColumnDescriptor,
    #[serde(skip)]
    pub on_existing: OnExisting,
}

impl AddColumn {
    /// # Panics
    ///
    /// Panics if a table name is empty or padded with whitespace. Migration
    /// files deserialize names through `TableName::try_new` and never panic.
    pub fn new(table: impl Into<String>, column: ColumnDescriptor) -> Self {
        Self {
            table: TableName::new(table),
            column,
            on_existing: OnExisting::Fail,
        }
    }
}

#[async_trait]
impl StepOperation for AddColumn {
    fn describe(&self) -> String {
        format!("add column {}.{}", self.table, self.column.name)
    }

    fn validate(&self) -> MigrateResult<()> {
        validate_column(&self.table, &self.column)?;
        if self.column.primary_key {
            return Err(MigrateError::Configuration(format!(
                "cannot add primary key column '{}' to existing table {}",
                self.column.name, self.table
            )));
        }
        Ok(())
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(vec![dialect.add_column_sql(&self.table, &self.column)])
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        if !ctx.db.relation_exists(&self.table).await? {
            return Err(missing(format!("table {}", self.table)));
        }
        if ctx.db.column_exists(&self.table, &self.column.name).await? {
            return self
                .on_existing
                .resolve(format!("column {}.{}", self.table, self.column.name));
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

/// Create an index on an existing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddIndex {
    pub table: TableName,
    pub index: IndexDescriptor,
    /// Refuse to create the index while any indexed column holds NULL
    #[serde(default)]
    pub require_populated: bool,
    #[serde(skip)]
    pub on_existing: OnExisting,
}

impl AddIndex {
    /// # Panics
    ///
    /// Panics if a table name is empty or padded with whitespace. Migration
    /// files deserialize names through `TableName::try_new` and never panic.
    pub fn new(table: impl Into<String>, index: IndexDescriptor) -> Self {
        Self {
            table: TableName::new(table),
            index,
            require_populated: false,
            on_existing: OnExisting::Fail,
        }
    }

    pub fn require_populated(mut self) -> Self {
        self.require_populated = true;
        self
    }

    pub fn on_existing(mut self, on_existing: OnExisting) -> Self {
        self.on_existing = on_existing;
        self
    }

    fn index_name(&self) -> String {
        self.index.name_for(&self.table)
    }

    async fn check_populated(&self, ctx: &StepContext<'_>) -> MigrateResult<()> {
        let predicate = self
            .index
            .columns
            .iter()
            .map(|c| format!("{} IS NULL", ctx.dialect.quote_ident(c)))
            .collect::<Vec<_>>()
            .join(" OR ");
        let nulls = ctx.count_where(&self.table, &predicate).await?;
        if nulls > 0 {
            return Err(MigrateError::Execution(format!(
                "index {} requires populated columns but {} row(s) of {} have NULL in ({})",
                self.index_name(),
                nulls,
                self.table,
                self.index.columns.join(", ")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StepOperation for AddIndex {
    fn describe(&self) -> String {
        format!("add index {} on {}", self.index_name(), self.table)
    }

    fn validate(&self) -> MigrateResult<()> {
        // Column existence is only known at run time for existing tables.
        validate_index(&self.table, &self.index, |_| true)?;
        Ok(())
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(vec![dialect.create_index_sql(&self.table, &self.index)])
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        if !ctx.db.relation_exists(&self.table).await? {
            return Err(missing(format!("table {}", self.table)));
        }
        if ctx.db.index_exists(&self.table, &self.index_name()).await? {
            return self
                .on_existing
                .resolve(format!("index {}", self.index_name()));
        }
        if self.require_populated {
            self.check_populated(ctx).await?;
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

/// Drop an index, identified by its descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropIndex {
    pub table: TableName,
    pub index: IndexDescriptor,
}

impl DropIndex {
    /// # Panics
    ///
    /// Panics if a table name is empty or padded with whitespace. Migration
    /// files deserialize names through `TableName::try_new` and never panic.
    pub fn new(table: impl Into<String>, index: IndexDescriptor) -> Self {
        Self {
            table: TableName::new(table),
            index,
        }
    }
}

#[async_trait]
impl StepOperation for DropIndex {
    fn describe(&self) -> String {
        format!("drop index {}", self.index.name_for(&self.table))
    }

    fn validate(&self) -> MigrateResult<()> {
        validate_index(&self.table, &self.index, |_| true)?;
        Ok(())
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(vec![
            dialect.drop_index_sql(&self.table, &self.index.name_for(&self.table))
        ])
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        let name = self.index.name_for(&self.table);
        if !ctx.db.index_exists(&self.table, &name).await? {
            return Err(missing(format!("index {}", name)));
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTable {
    pub table: TableName,
}

impl DropTable {
    /// # Panics
    ///
    /// Panics if a table name is empty or padded with whitespace. Migration
    /// files deserialize names through `TableName::try_new` and never panic.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: TableName::new(table),
        }
    }
}

#[async_trait]
impl StepOperation for DropTable {
    fn describe(&self) -> String {
        format!("drop table {}", self.table)
    }

    fn validate(&self) -> MigrateResult<()> {
        Ok(())
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(vec![dialect.drop_table_sql(&self.table)])
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        if !ctx.db.relation_exists(&self.table).await? {
            return Err(missing(format!("table {}", self.table)));
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameTable {
    pub from: TableName,
    pub to: TableName,
}

impl RenameTable {
    /// # Panics
    ///
    /// Panics if a table name is empty or padded with whitespace. Migration
    /// files deserialize names through `TableName::try_new` and never panic.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: TableName::new(from),
            to: TableName::new(to),
        }
    }
}

#[async_trait]
impl StepOperation for RenameTable {
    fn describe(&self) -> String {
        format!("rename table {} to {}", self.from, self.to)
    }

    fn validate(&self) -> MigrateResult<()> {
        if self.from == self.to {
            return Err(MigrateError::Configuration(format!(
                "rename of {} to itself",
                self.from
            )));
        }
        Ok(())
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(vec![dialect.rename_table_sql(&self.from, &self.to)])
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        if !ctx.db.relation_exists(&self.from).await? {
            return Err(missing(format!("table {}", self.from)));
        }
        if ctx.db.relation_exists(&self.to).await? {
            return Err(MigrateError::SchemaConflict(format!(
                "cannot rename {} to {}: destination already exists",
                self.from, self.to
            )));
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

/// Literal SQL chosen per dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSql {
    pub sql: RawSqlVariants,
}

impl RawSql {
    pub fn new(sql: RawSqlVariants) -> Self {
        Self { sql }
    }
}

#[async_trait]
impl StepOperation for RawSql {
    fn describe(&self) -> String {
        "raw sql".to_string()
    }

    fn validate(&self) -> MigrateResult<()> {
        if self.sql.is_empty() {
            return Err(MigrateError::Configuration(
                "raw sql step has no variants and no fallback".to_string(),
            ));
        }
        Ok(())
    }

    fn check_dialect(&self, dialect: Dialect) -> MigrateResult<()> {
        self.sql.resolve(dialect)?;
        Ok(())
    }

    fn writes_data(&self) -> bool {
        true
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        Ok(self.sql.render(dialect)?.into_iter().collect())
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        match self.sql.render(ctx.dialect)? {
            Some(sql) => {
                ctx.db.execute_batch(&sql).await?;
                Ok(vec![sql])
            }
            None => {
                log::debug!("raw sql has an explicit no-op for {}", ctx.dialect.name());
                Ok(Vec::new())
            }
        }
    }
}

fn default_prefix() -> String {
    "u".to_string()
}

fn default_width() -> u32 {
    9
}

/// Identifier synthesized from an integer key: `prefix` followed by the key
/// zero-padded to at least `width` digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddedIdentifier {
    /// Integer column the identifier is derived from
    pub key: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_width")]
    pub width: u32,
}

impl PaddedIdentifier {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prefix: default_prefix(),
            width: default_width(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// The identifier every dialect produces for `key`.
    ///
    /// Keys wider than `width` are kept whole.
    pub fn value_for(&self, key: u64) -> String {
        format!("{}{:0width$}", self.prefix, key, width = self.width as usize)
    }

    /// SQL expression computing the identifier from the key column.
    pub fn expr(&self, dialect: &dyn SqlDialect) -> String {
        dialect.padded_key_expr(&self.prefix, self.width, &dialect.quote_ident(&self.key))
    }

    pub(crate) fn validate(&self) -> MigrateResult<()> {
        if self.width == 0 {
            return Err(MigrateError::Configuration(format!(
                "padded identifier on '{}' needs width >= 1",
                self.key
            )));
        }
        if self.prefix.contains('\'') {
            return Err(MigrateError::Configuration(format!(
                "padded identifier prefix {:?} may not contain quotes",
                self.prefix
            )));
        }
        Ok(())
    }

    /// Padding disagrees on signs across dialects, so negative keys are
    /// refused before any value is written.
    pub(crate) async fn check_keys(
        &self,
        ctx: &StepContext<'_>,
        table: &TableName,
    ) -> MigrateResult<()> {
        let predicate = format!("{} < 0", ctx.dialect.quote_ident(&self.key));
        let negative = ctx.count_where(table, &predicate).await?;
        if negative > 0 {
            return Err(MigrateError::Execution(format!(
                "{} row(s) of {} have a negative {}; cannot synthesize identifiers",
                negative, table, self.key
            )));
        }
        Ok(())
    }
}

/// Backfill a column with synthesized identifiers where it is NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulateIdentifier {
    pub table: TableName,
    pub column: String,
    pub identifier: PaddedIdentifier,
}

impl PopulateIdentifier {
    /// # Panics
    ///
    /// Panics if a table name is empty or padded with whitespace. Migration
    /// files deserialize names through `TableName::try_new` and never panic.
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        identifier: PaddedIdentifier,
    ) -> Self {
        Self {
            table: TableName::new(table),
            column: column.into(),
            identifier,
        }
    }
}

#[async_trait]
impl StepOperation for PopulateIdentifier {
    fn describe(&self) -> String {
        format!("populate {}.{} from {}", self.table, self.column, self.identifier.key)
    }

    fn writes_data(&self) -> bool {
        true
    }

    fn validate(&self) -> MigrateResult<()> {
        if self.column.trim().is_empty() {
            return Err(MigrateError::Configuration(format!(
                "populate identifier on {} has no column",
                self.table
            )));
        }
        self.identifier.validate()
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        let column = dialect.quote_ident(&self.column);
        Ok(vec![format!(
            "UPDATE {} SET {} = {} WHERE {} IS NULL",
            dialect.quote_ident(&self.table),
            column,
            self.identifier.expr(dialect),
            column
        )])
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        if !ctx.db.column_exists(&self.table, &self.column).await? {
            return Err(missing(format!("column {}.{}", self.table, self.column)));
        }
        self.identifier.check_keys(ctx, &self.table).await?;
        ctx.run_all(self.render(ctx.dialect)?).await
    }
}

#[cfg(test)]
#[path = "operations_test.rs"]
mod tests;

//! Table replace: evolve a table's shape through a temporary copy.
//!
//! A [`TableReplace`] declaration expands at registration into an ordered
//! list of named stages (create temp, copy, drop source, rename, then one
//! step per destination index). Every stage inspects the live schema before
//! acting, so a run interrupted anywhere in the sequence resumes cleanly.

use crate::error::{MigrateError, MigrateResult};
use crate::operations::{AddIndex, CreateTable, OnExisting, PaddedIdentifier};
use crate::step::{MigrationStep, StepContext, StepOperation};
use async_trait::async_trait;
use serde::Deserialize;
use st_core::{Dialect, IndexDescriptor, TableDescriptor, TableName};
use st_sql::{RawSqlVariants, SqlDialect};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a destination column's values come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SourceRepr")]
pub enum ColumnSource {
    /// Copy a source column
    Column(String),
    /// Synthesize an identifier from an integer source column
    PaddedKey(PaddedIdentifier),
    /// Per-dialect SQL expression over the source row
    Expression(RawSqlVariants),
    /// Leave the column to its default
    Default,
}

impl ColumnSource {
    pub fn column(name: impl Into<String>) -> Self {
        ColumnSource::Column(name.into())
    }
}

/// Mapping values in YAML: a bare string names a source column, otherwise
/// a map with exactly one of the keys below.
#[derive(Deserialize)]
#[serde(untagged)]
enum SourceRepr {
    Column(String),
    Map(SourceFields),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceFields {
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    padded_key: Option<PaddedIdentifier>,
    #[serde(default)]
    expression: Option<RawSqlVariants>,
    #[serde(default)]
    default: bool,
}

impl TryFrom<SourceRepr> for ColumnSource {
    type Error = String;

    fn try_from(repr: SourceRepr) -> Result<Self, Self::Error> {
        let fields = match repr {
            SourceRepr::Column(name) => return Ok(ColumnSource::Column(name)),
            SourceRepr::Map(fields) => fields,
        };
        let mut found = Vec::new();
        if let Some(name) = fields.column {
            found.push(ColumnSource::Column(name));
        }
        if let Some(key) = fields.padded_key {
            found.push(ColumnSource::PaddedKey(key));
        }
        if let Some(expr) = fields.expression {
            found.push(ColumnSource::Expression(expr));
        }
        if fields.default {
            found.push(ColumnSource::Default);
        }
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err("column source needs one of column, padded_key, expression, default".into()),
            _ => Err("column source may only set one of column, padded_key, expression, default".into()),
        }
    }
}

/// Replace table `from` with table `to`, copying rows through `mapping`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableReplace {
    pub from: TableDescriptor,
    pub to: TableDescriptor,
    /// Distinguishes successive replacements of the same table
    pub version: u32,
    /// Destination column -> source
    #[serde(default)]
    pub mapping: BTreeMap<String, ColumnSource>,
}

impl TableReplace {
    pub fn new(from: TableDescriptor, to: TableDescriptor, version: u32) -> Self {
        Self {
            from,
            to,
            version,
            mapping: BTreeMap::new(),
        }
    }

    /// Fill destination column `dest` from `source`.
    pub fn map(mut self, dest: impl Into<String>, source: ColumnSource) -> Self {
        self.mapping.insert(dest.into(), source);
        self
    }

    /// Copy source column `src` into destination column `dest`.
    pub fn map_column(self, dest: impl Into<String>, src: impl Into<String>) -> Self {
        self.map(dest, ColumnSource::Column(src.into()))
    }

    /// Name of the intermediate table: `<to>_tmp_v<version>`
    pub fn temp_table(&self) -> TableName {
        self.to.name.temp_for_version(self.version)
    }

    fn config_error(&self, message: String) -> MigrateError {
        MigrateError::Configuration(format!(
            "replace {} -> {}: {}",
            self.from.name, self.to.name, message
        ))
    }

    /// Check the declaration against both descriptors.
    pub fn validate(&self) -> MigrateResult<()> {
        self.from.validate()?;
        self.to.validate()?;

        let temp = self.temp_table();
        if temp == self.from.name {
            return Err(self.config_error(format!(
                "source table may not be named like the temporary table {}",
                temp
            )));
        }

        for (dest, source) in &self.mapping {
            if self.to.get_column(dest).is_none() {
                return Err(self.config_error(format!(
                    "mapping targets unknown destination column '{}'",
                    dest
                )));
            }
            match source {
                ColumnSource::Column(src) => self.require_source_column(dest, src)?,
                ColumnSource::PaddedKey(key) => {
                    key.validate()?;
                    self.require_source_column(dest, &key.key)?;
                    let key_column = self.from.get_column(&key.key);
                    if !key_column.is_some_and(|c| c.column_type.is_integer()) {
                        return Err(self.config_error(format!(
                            "padded key '{}' for '{}' must be an integer column",
                            key.key, dest
                        )));
                    }
                    if key_column.is_some_and(|c| c.nullable) {
                        return Err(self.config_error(format!(
                            "padded key '{}' for '{}' must be NOT NULL",
                            key.key, dest
                        )));
                    }
                }
                ColumnSource::Expression(expr) => {
                    for dialect in Dialect::ALL {
                        if !matches!(expr.resolve(dialect), Ok(Some(_))) {
                            return Err(self.config_error(format!(
                                "expression for '{}' has no SQL for {}",
                                dest, dialect
                            )));
                        }
                    }
                }
                ColumnSource::Default => {}
            }
        }

        for column in &self.to.columns {
            let copied = matches!(
                self.mapping.get(&column.name),
                Some(source) if *source != ColumnSource::Default
            );
            if !copied && !column.has_implicit_value() {
                return Err(self.config_error(format!(
                    "destination column '{}' is not mapped and is NOT NULL without a default",
                    column.name
                )));
            }
        }

        if self.copied_columns().is_empty() {
            return Err(self.config_error("mapping copies no columns".to_string()));
        }
        Ok(())
    }

    fn require_source_column(&self, dest: &str, src: &str) -> MigrateResult<()> {
        if self.from.get_column(src).is_none() {
            return Err(self.config_error(format!(
                "'{}' maps from unknown source column '{}'",
                dest, src
            )));
        }
        Ok(())
    }

    /// Destination columns that receive values, in destination order.
    fn copied_columns(&self) -> Vec<(&str, &ColumnSource)> {
        self.to
            .columns
            .iter()
            .filter_map(|c| match self.mapping.get(&c.name) {
                Some(ColumnSource::Default) | None => None,
                Some(source) => Some((c.name.as_str(), source)),
            })
            .collect()
    }

    fn padded_keys(&self) -> impl Iterator<Item = &PaddedIdentifier> {
        self.mapping.values().filter_map(|source| match source {
            ColumnSource::PaddedKey(key) => Some(key),
            _ => None,
        })
    }

    /// `INSERT INTO tmp (...) SELECT ... FROM from`
    pub fn copy_sql(&self, dialect: &dyn SqlDialect) -> MigrateResult<String> {
        let copied = self.copied_columns();
        let mut dest_columns = Vec::with_capacity(copied.len());
        let mut exprs = Vec::with_capacity(copied.len());
        for (dest, source) in copied {
            let expr = match source {
                ColumnSource::Column(src) => dialect.quote_ident(src),
                ColumnSource::PaddedKey(key) => key.expr(dialect),
                ColumnSource::Expression(expr) => {
                    expr.render(dialect)?.ok_or_else(|| MigrateError::UnsupportedDialect {
                        dialect: dialect.dialect(),
                        context: format!("expression for column '{}' is a no-op", dest),
                    })?
                }
                ColumnSource::Default => continue,
            };
            dest_columns.push(dest);
            exprs.push(expr);
        }
        Ok(dialect.insert_select_sql(&self.temp_table(), &dest_columns, &self.from.name, &exprs))
    }

    /// Generator resets for copied auto-increment columns of the temp table.
    /// Explicit ids leave a Postgres sequence behind the data otherwise.
    pub fn identity_sync_sql(&self, dialect: &dyn SqlDialect) -> Vec<String> {
        let temp = self.temp_table();
        self.copied_columns()
            .into_iter()
            .filter(|(dest, _)| self.to.get_column(dest).is_some_and(|c| c.auto_increment))
            .filter_map(|(dest, _)| dialect.sync_identity_sql(&temp, dest))
            .collect()
    }

    /// Expand into named steps: `N: create`, `N: copy`, `N: drop`,
    /// `N: rename`, then `N: add index` per destination index.
    pub fn expand(&self, name: &str) -> MigrateResult<Vec<MigrationStep>> {
        let replace = Arc::new(self.clone());
        let temp = self.temp_table();
        let stage = |stage: Stage| ReplaceStage {
            replace: Arc::clone(&replace),
            stage,
        };

        let mut steps = vec![
            MigrationStep::new(format!("{}: create {}", name, temp), stage(Stage::Create))?,
            MigrationStep::new(
                format!("{}: copy {} to {}", name, self.from.name, temp),
                stage(Stage::Copy),
            )?,
            MigrationStep::new(
                format!("{}: drop {}", name, self.from.name),
                stage(Stage::DropSource),
            )?,
            MigrationStep::new(
                format!("{}: rename {} to {}", name, temp, self.to.name),
                stage(Stage::Rename),
            )?,
        ];
        for index in &self.to.indices {
            steps.push(MigrationStep::new(
                format!("{}: add index {}", name, index.name_for(&self.to.name)),
                stage(Stage::AddIndex(index.clone())),
            )?);
        }
        Ok(steps)
    }
}

/// The phases of a table replace, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Create,
    Copy,
    DropSource,
    Rename,
    AddIndex(IndexDescriptor),
}

/// One expanded stage of a [`TableReplace`].
#[derive(Debug, Clone)]
pub struct ReplaceStage {
    pub replace: Arc<TableReplace>,
    pub stage: Stage,
}

impl ReplaceStage {
    fn create_op(&self) -> CreateTable {
        let table = self
            .replace
            .to
            .without_indices()
            .renamed(self.replace.temp_table());
        CreateTable::new(table).on_existing(OnExisting::Skip)
    }

    /// Unique indices verify population before the constraint is added.
    fn index_op(&self, index: &IndexDescriptor) -> AddIndex {
        let op = AddIndex::new(self.replace.to.name.as_str(), index.clone())
            .on_existing(OnExisting::Skip);
        if index.unique {
            op.require_populated()
        } else {
            op
        }
    }

    async fn apply_create(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        let r = &self.replace;
        if r.to.name != r.from.name
            && ctx.db.relation_exists(&r.to.name).await?
            && ctx.db.relation_exists(&r.from.name).await?
        {
            return Err(MigrateError::SchemaConflict(format!(
                "cannot replace {} with {}: destination already exists",
                r.from.name, r.to.name
            )));
        }
        self.create_op().apply(ctx).await
    }

    async fn apply_copy(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        let r = &self.replace;
        let temp = r.temp_table();
        if !ctx.db.relation_exists(&temp).await? {
            log::debug!("{} is gone, copy already completed", temp);
            return Ok(Vec::new());
        }
        if !ctx.db.relation_exists(&r.from.name).await? {
            log::debug!("{} is gone, copy already completed", r.from.name);
            return Ok(Vec::new());
        }

        for key in r.padded_keys() {
            key.check_keys(ctx, &r.from.name).await?;
        }

        let executed = ctx.run_all(self.render(ctx.dialect)?).await?;

        let select_all = |table: &str| format!("SELECT 1 FROM {}", ctx.dialect.quote_ident(table));
        let source_rows = ctx.db.query_count(&select_all(&r.from.name)).await?;
        let copied_rows = ctx.db.query_count(&select_all(&temp)).await?;
        if source_rows != copied_rows {
            return Err(MigrateError::Execution(format!(
                "copy of {} into {} produced {} rows, expected {}",
                r.from.name, temp, copied_rows, source_rows
            )));
        }
        Ok(executed)
    }

    async fn apply_drop(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        let r = &self.replace;
        if !ctx.db.relation_exists(&r.from.name).await? {
            log::debug!("{} already dropped", r.from.name);
            return Ok(Vec::new());
        }
        let temp = r.temp_table();
        if !ctx.db.relation_exists(&temp).await? {
            return Err(MigrateError::SchemaConflict(format!(
                "refusing to drop {}: copy target {} does not exist",
                r.from.name, temp
            )));
        }
        ctx.run_all(self.render(ctx.dialect)?).await
    }

    async fn apply_rename(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        let r = &self.replace;
        let temp = r.temp_table();
        let temp_exists = ctx.db.relation_exists(&temp).await?;
        let dest_exists = ctx.db.relation_exists(&r.to.name).await?;
        match (temp_exists, dest_exists) {
            (true, false) => ctx.run_all(self.render(ctx.dialect)?).await,
            (false, true) => {
                log::debug!("{} already renamed to {}", temp, r.to.name);
                Ok(Vec::new())
            }
            (true, true) => Err(MigrateError::SchemaConflict(format!(
                "cannot rename {} to {}: both tables exist",
                temp, r.to.name
            ))),
            (false, false) => Err(MigrateError::SchemaConflict(format!(
                "cannot rename {} to {}: neither table exists",
                temp, r.to.name
            ))),
        }
    }
}

#[async_trait]
impl StepOperation for ReplaceStage {
    fn describe(&self) -> String {
        let r = &self.replace;
        match &self.stage {
            Stage::Create => format!("create {}", r.temp_table()),
            Stage::Copy => format!("copy {} to {}", r.from.name, r.temp_table()),
            Stage::DropSource => format!("drop {}", r.from.name),
            Stage::Rename => format!("rename {} to {}", r.temp_table(), r.to.name),
            Stage::AddIndex(index) => format!("add index {}", index.name_for(&r.to.name)),
        }
    }

    fn validate(&self) -> MigrateResult<()> {
        self.replace.validate()
    }

    fn writes_data(&self) -> bool {
        matches!(self.stage, Stage::Copy)
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        let r = &self.replace;
        match &self.stage {
            Stage::Create => self.create_op().render(dialect),
            Stage::Copy => {
                let mut sql = vec![dialect.delete_all_sql(&r.temp_table()), r.copy_sql(dialect)?];
                sql.extend(r.identity_sync_sql(dialect));
                Ok(sql)
            }
            Stage::DropSource => Ok(vec![dialect.drop_table_sql(&r.from.name)]),
            Stage::Rename => Ok(vec![dialect.rename_table_sql(&r.temp_table(), &r.to.name)]),
            Stage::AddIndex(index) => self.index_op(index).render(dialect),
        }
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        match &self.stage {
            Stage::Create => self.apply_create(ctx).await,
            Stage::Copy => self.apply_copy(ctx).await,
            Stage::DropSource => self.apply_drop(ctx).await,
            Stage::Rename => self.apply_rename(ctx).await,
            Stage::AddIndex(index) => self.index_op(index).apply(ctx).await,
        }
    }
}

#[cfg(test)]
#[path = "replace_test.rs"]
mod tests;

//! Migration steps and the operation seam.

use crate::error::{MigrateError, MigrateResult};
use crate::operations::{
    AddColumn, AddIndex, CreateTable, DropIndex, DropTable, PopulateIdentifier, RawSql,
    RenameTable,
};
use crate::replace::ReplaceStage;
use async_trait::async_trait;
use st_core::{Dialect, MigrationName};
use st_db::Database;
use st_sql::SqlDialect;

/// Connection and adapter a step executes against.
pub struct StepContext<'a> {
    pub db: &'a dyn Database,
    pub dialect: &'a dyn SqlDialect,
}

impl<'a> StepContext<'a> {
    pub fn new(db: &'a dyn Database, dialect: &'a dyn SqlDialect) -> Self {
        Self { db, dialect }
    }

    /// Execute `statements` in order, returning them for the ledger.
    pub async fn run_all(&self, statements: Vec<String>) -> MigrateResult<Vec<String>> {
        for sql in &statements {
            self.db.execute(sql).await?;
        }
        Ok(statements)
    }

    /// Number of rows in `table` matching `predicate`.
    pub async fn count_where(&self, table: &str, predicate: &str) -> MigrateResult<usize> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {}",
            self.dialect.quote_ident(table),
            predicate
        );
        Ok(self.db.query_count(&sql).await?)
    }
}

/// One kind of schema change.
///
/// `render` is pure and shows what a fresh apply would execute; `apply`
/// inspects the live schema first and returns the statements it actually
/// ran. An empty result means there was nothing left to do.
#[async_trait]
pub trait StepOperation: Send + Sync {
    /// Short human description, e.g. `create table users`
    fn describe(&self) -> String;

    /// Registration-time checks
    fn validate(&self) -> MigrateResult<()>;

    /// Fail early if the step cannot run on `dialect`
    fn check_dialect(&self, _dialect: Dialect) -> MigrateResult<()> {
        Ok(())
    }

    /// Whether the step writes rows. Data steps get a transaction even on
    /// engines whose DDL commits implicitly.
    fn writes_data(&self) -> bool {
        false
    }

    fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>>;

    async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>>;
}

/// Every operation a step can carry.
#[derive(Debug, Clone)]
pub enum Operation {
    CreateTable(CreateTable),
    AddColumn(AddColumn),
    AddIndex(AddIndex),
    DropIndex(DropIndex),
    DropTable(DropTable),
    RenameTable(RenameTable),
    RawSql(RawSql),
    PopulateIdentifier(PopulateIdentifier),
    Replace(ReplaceStage),
}

impl Operation {
    fn inner(&self) -> &dyn StepOperation {
        match self {
            Operation::CreateTable(op) => op,
            Operation::AddColumn(op) => op,
            Operation::AddIndex(op) => op,
            Operation::DropIndex(op) => op,
            Operation::DropTable(op) => op,
            Operation::RenameTable(op) => op,
            Operation::RawSql(op) => op,
            Operation::PopulateIdentifier(op) => op,
            Operation::Replace(op) => op,
        }
    }

    pub fn describe(&self) -> String {
        self.inner().describe()
    }

    pub fn validate(&self) -> MigrateResult<()> {
        self.inner().validate()
    }

    pub fn check_dialect(&self, dialect: Dialect) -> MigrateResult<()> {
        self.inner().check_dialect(dialect)
    }

    pub fn writes_data(&self) -> bool {
        self.inner().writes_data()
    }

    pub fn render(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<String>> {
        self.inner().render(dialect)
    }

    pub async fn apply(&self, ctx: &StepContext<'_>) -> MigrateResult<Vec<String>> {
        self.inner().apply(ctx).await
    }
}

macro_rules! operation_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operation {
                fn from(op: $ty) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

operation_from! {
    CreateTable => CreateTable,
    AddColumn => AddColumn,
    AddIndex => AddIndex,
    DropIndex => DropIndex,
    DropTable => DropTable,
    RenameTable => RenameTable,
    RawSql => RawSql,
    PopulateIdentifier => PopulateIdentifier,
    Replace => ReplaceStage,
}

/// A named migration; the name is its ledger key.
#[derive(Debug, Clone)]
pub struct MigrationStep {
    pub name: MigrationName,
    pub operation: Operation,
}

impl MigrationStep {
    /// Build a step, rejecting names that cannot be used as ledger keys.
    pub fn new(name: impl Into<String>, operation: impl Into<Operation>) -> MigrateResult<Self> {
        let name = name.into();
        let name = MigrationName::try_new(name.clone()).ok_or_else(|| {
            MigrateError::Configuration(format!(
                "migration name '{}' must be non-empty without surrounding whitespace",
                name
            ))
        })?;
        Ok(Self {
            name,
            operation: operation.into(),
        })
    }
}

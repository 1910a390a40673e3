//! st-migrate - Migration engine for Strata
//!
//! Migrations are registered in order on a [`Registry`], either through the
//! builder API or from YAML definition files, and applied by a [`Runner`]
//! that records each completed step in a ledger table inside the target
//! database.

pub mod definition;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod operations;
pub mod registry;
pub mod replace;
pub mod runner;
pub mod step;

pub use definition::{load_paths, Change, MigrationDef, MigrationFile};
pub use error::{MigrateError, MigrateResult};
pub use ledger::{Ledger, LedgerEntry, DEFAULT_LEDGER_TABLE};
pub use lock::{LockOptions, MigrationLock};
pub use operations::{
    AddColumn, AddIndex, CreateTable, DropIndex, DropTable, OnExisting, PaddedIdentifier,
    PopulateIdentifier, RawSql, RenameTable,
};
pub use registry::Registry;
pub use replace::{ColumnSource, ReplaceStage, Stage, TableReplace};
pub use runner::{PlannedStep, RunReport, Runner, RunnerOptions, StepState, StepStatus};
pub use step::{MigrationStep, Operation, StepContext, StepOperation};

//! Applies pending migrations in order, one transaction per step.

use crate::error::MigrateResult;
use crate::ledger::{Ledger, DEFAULT_LEDGER_TABLE};
use crate::lock::{LockOptions, MigrationLock};
use crate::registry::{annotate, Registry};
use crate::step::{MigrationStep, StepContext};
use chrono::{DateTime, Utc};
use st_core::{MigrationName, TableName};
use st_db::Database;
use st_sql::{dialect_for, SqlDialect};

/// Lifecycle of a step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Applied,
    Failed,
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepState::Pending => "pending",
            StepState::Running => "running",
            StepState::Applied => "applied",
            StepState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Ledger view of one registered step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepStatus {
    pub name: MigrationName,
    pub state: StepState,
    pub applied_at: Option<DateTime<Utc>>,
}

/// A step with the SQL a fresh apply would execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: MigrationName,
    pub description: String,
    pub sql: Vec<String>,
}

impl PlannedStep {
    pub(crate) fn render(step: &MigrationStep, dialect: &dyn SqlDialect) -> MigrateResult<Self> {
        let sql = step
            .operation
            .render(dialect)
            .map_err(|e| annotate(&step.name, e))?;
        Ok(Self {
            name: step.name.clone(),
            description: step.operation.describe(),
            sql,
        })
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Steps applied by this run, in order
    pub applied: Vec<MigrationName>,
    /// Steps already recorded in the ledger before the run
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// `None` runs without the cross-process lock
    pub lock: Option<LockOptions>,
    /// Apply at most this many pending steps
    pub limit: Option<usize>,
    pub ledger_table: TableName,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            lock: Some(LockOptions::default()),
            limit: None,
            ledger_table: TableName::new(DEFAULT_LEDGER_TABLE),
        }
    }
}

/// Drives a [`Registry`] against one database connection.
pub struct Runner<'a> {
    db: &'a dyn Database,
    registry: &'a Registry,
    dialect: Box<dyn SqlDialect>,
    options: RunnerOptions,
}

impl<'a> Runner<'a> {
    /// The dialect adapter is resolved once from the connection.
    pub fn new(db: &'a dyn Database, registry: &'a Registry, options: RunnerOptions) -> Self {
        Self {
            db,
            registry,
            dialect: dialect_for(db.dialect()),
            options,
        }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    fn ledger(&self) -> Ledger<'_> {
        Ledger::new(
            self.db,
            self.dialect.as_ref(),
            self.options.ledger_table.clone(),
        )
    }

    /// Every registered step with its ledger state.
    pub async fn status(&self) -> MigrateResult<Vec<StepStatus>> {
        let entries = self.ledger().entries().await?;
        Ok(self
            .registry
            .steps()
            .iter()
            .map(|step| {
                let entry = entries.iter().find(|e| e.name == step.name.as_str());
                StepStatus {
                    name: step.name.clone(),
                    state: if entry.is_some() {
                        StepState::Applied
                    } else {
                        StepState::Pending
                    },
                    applied_at: entry.map(|e| e.applied_at),
                }
            })
            .collect())
    }

    /// Steps without a ledger row, in registration order.
    pub async fn pending(&self) -> MigrateResult<Vec<&'a MigrationStep>> {
        let applied = self.ledger().applied_names().await?;
        let registry: &'a Registry = self.registry;
        Ok(registry
            .steps()
            .iter()
            .filter(|step| !applied.contains(step.name.as_str()))
            .collect())
    }

    /// Pending steps with the SQL each would execute.
    pub async fn plan(&self) -> MigrateResult<Vec<PlannedStep>> {
        self.pending()
            .await?
            .into_iter()
            .map(|step| PlannedStep::render(step, self.dialect.as_ref()))
            .collect()
    }

    /// Apply pending steps.
    pub async fn run(&self) -> MigrateResult<RunReport> {
        self.run_with(|_, _| {}).await
    }

    /// Apply pending steps, reporting each state transition to `observer`.
    ///
    /// Stops at the first failure; later steps are not attempted.
    pub async fn run_with<F>(&self, mut observer: F) -> MigrateResult<RunReport>
    where
        F: FnMut(&MigrationStep, StepState) + Send,
    {
        let lock = match &self.options.lock {
            Some(options) => Some(MigrationLock::acquire(self.db, options).await?),
            None => None,
        };

        let result = self.run_locked(&mut observer).await;

        if let Some(lock) = lock {
            if let Err(e) = lock.release().await {
                if result.is_ok() {
                    return Err(e);
                }
                log::warn!("Failed to release migration lock: {}", e);
            }
        }
        result
    }

    async fn run_locked<F>(&self, observer: &mut F) -> MigrateResult<RunReport>
    where
        F: FnMut(&MigrationStep, StepState) + Send,
    {
        let ledger = self.ledger();
        ledger.ensure().await?;
        let applied = ledger.applied_names().await?;

        let steps = self.registry.steps();
        let pending: Vec<&MigrationStep> = steps
            .iter()
            .filter(|step| !applied.contains(step.name.as_str()))
            .take(self.options.limit.unwrap_or(usize::MAX))
            .collect();

        let mut report = RunReport {
            applied: Vec::with_capacity(pending.len()),
            skipped: steps
                .iter()
                .filter(|step| applied.contains(step.name.as_str()))
                .count(),
        };

        // Surface missing dialect variants before any step executes.
        for step in &pending {
            step.operation
                .check_dialect(self.dialect.dialect())
                .map_err(|e| annotate(&step.name, e))?;
        }

        if pending.is_empty() {
            log::info!("No pending migrations");
        }

        for step in pending {
            observer(step, StepState::Running);
            match self.apply_step(&ledger, step).await {
                Ok(()) => {
                    observer(step, StepState::Applied);
                    report.applied.push(step.name.clone());
                }
                Err(e) => {
                    observer(step, StepState::Failed);
                    log::warn!("Migration '{}' failed", step.name);
                    return Err(annotate(&step.name, e));
                }
            }
        }
        Ok(report)
    }

    /// Whether `step` and its ledger row share a transaction. Schema steps
    /// only do where DDL is transactional; data steps always do.
    fn in_transaction(&self, step: &MigrationStep) -> bool {
        self.dialect.supports_transactional_ddl() || step.operation.writes_data()
    }

    async fn apply_step(&self, ledger: &Ledger<'_>, step: &MigrationStep) -> MigrateResult<()> {
        let ctx = StepContext::new(self.db, self.dialect.as_ref());
        let transactional = self.in_transaction(step);

        if transactional {
            self.db.begin().await?;
        }

        let result = async {
            let executed = step.operation.apply(&ctx).await?;
            if executed.is_empty() {
                log::debug!("{}: nothing to execute", step.name);
            }
            ledger
                .record_applied(&step.name, Utc::now(), &executed.join(";\n"))
                .await
        }
        .await;

        if transactional {
            match &result {
                Ok(()) => {
                    if let Err(commit_err) = self.db.commit().await {
                        if let Err(e) = self.db.rollback().await {
                            log::warn!("Rollback after failed commit also failed: {}", e);
                        }
                        return Err(commit_err.into());
                    }
                }
                Err(_) => {
                    log::warn!("Rolling back migration '{}'", step.name);
                    if let Err(e) = self.db.rollback().await {
                        log::warn!("Rollback failed: {}", e);
                    }
                }
            }
        }

        if result.is_ok() {
            log::info!("Applied migration '{}' ({})", step.name, step.operation.describe());
        }
        result
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;

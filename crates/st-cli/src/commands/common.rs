//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use st_core::{Config, TableName};
use st_db::{connect_config, Database};
use st_migrate::{load_paths, LockOptions, Registry, RunnerOptions};
use st_sql::SqlDialect;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Returned instead of calling `std::process::exit` so that open
/// connections and locks are dropped before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A loaded project: configuration plus migration registry.
pub(crate) struct Project {
    pub(crate) config: Config,
    pub(crate) registry: Registry,
}

/// Load the config named by `--config`, or the one in the project directory.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<(PathBuf, Config)> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load config")?;
    Ok((root, config))
}

/// Load config and every migration definition it points at.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let (root, config) = load_config(global)?;
    let registry = load_paths(&config.migration_paths_absolute(&root))
        .context("Failed to load migrations")?;
    log::debug!(
        "Loaded {} migration step(s) for project '{}'",
        registry.len(),
        config.name
    );
    Ok(Project { config, registry })
}

/// Connect to the database selected by `--target` / `STRATA_TARGET`.
pub(crate) async fn connect(config: &Config, global: &GlobalArgs) -> Result<Box<dyn Database>> {
    let target = Config::resolve_target(global.target.as_deref());
    let db_config = config
        .get_database_config(target.as_deref())
        .context("Failed to get database configuration")?;
    if let Some(target) = &target {
        log::debug!("Using target '{}'", target);
    }
    connect_config(&db_config)
        .await
        .context("Failed to connect to database")
}

/// Runner options derived from the project config.
pub(crate) fn runner_options(config: &Config, limit: Option<usize>) -> Result<RunnerOptions> {
    let ledger_table = TableName::try_new(config.ledger_table.clone())
        .with_context(|| format!("Invalid ledger table '{}'", config.ledger_table))?;
    Ok(RunnerOptions {
        lock: Some(LockOptions::from(&config.lock)),
        limit,
        ledger_table,
    })
}

/// Print rendered steps as a SQL script.
pub(crate) fn print_plan<'a>(
    steps: impl IntoIterator<Item = &'a st_migrate::PlannedStep>,
    dialect: &dyn SqlDialect,
) {
    let mut printed = 0usize;
    for step in steps {
        printed += 1;
        println!("-- {} ({})", step.name, step.description);
        if step.sql.is_empty() {
            println!("-- nothing to run on {}", dialect.name());
        }
        for sql in &step.sql {
            println!("{};", sql.trim_end().trim_end_matches(';'));
        }
        println!();
    }
    if printed == 0 {
        println!("-- no pending migrations");
    }
}

//! Validate command implementation

use anyhow::Result;
use st_core::{Config, Dialect};
use st_migrate::{load_paths, Registry};
use st_sql::{dialect_for, SqlDialect};
use std::collections::BTreeSet;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{load_config, ExitCode};

/// Validation result severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single validation issue, scoped to a dialect when one applies
struct ValidationIssue {
    severity: Severity,
    dialect: Option<Dialect>,
    message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dialect {
            Some(dialect) => write!(f, "[{}] {}: {}", self.severity, dialect, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

#[derive(Default)]
struct ValidationContext {
    issues: Vec<ValidationIssue>,
}

impl ValidationContext {
    fn push(&mut self, severity: Severity, dialect: Option<Dialect>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity,
            dialect,
            message: message.into(),
        });
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    }
}

/// Dialects the project actually deploys to: the base database and every target.
fn configured_dialects(config: &Config, ctx: &mut ValidationContext) -> BTreeSet<Dialect> {
    let blocks = std::iter::once(("database".to_string(), &config.database)).chain(
        config
            .targets
            .iter()
            .filter_map(|(name, t)| t.database.as_ref().map(|db| (format!("targets.{name}"), db))),
    );

    let mut dialects = BTreeSet::new();
    for (label, database) in blocks {
        match database.dialect() {
            Ok(dialect) => {
                dialects.insert(dialect);
            }
            Err(e) => ctx.push(Severity::Error, None, format!("{label}: {e}")),
        }
    }
    dialects
}

/// Render every step for `adapter` and make sure the SQL parses.
///
/// Missing variants are errors for deployed dialects and warnings otherwise.
fn check_dialect(
    registry: &Registry,
    adapter: &dyn SqlDialect,
    required: bool,
    ctx: &mut ValidationContext,
) {
    let dialect = adapter.dialect();
    let missing = if required {
        Severity::Error
    } else {
        Severity::Warning
    };

    if let Err(e) = registry.check_dialect(dialect) {
        ctx.push(missing, Some(dialect), e.to_string());
        return;
    }

    let plan = match registry.render_all(adapter) {
        Ok(plan) => plan,
        Err(e) => {
            ctx.push(missing, Some(dialect), e.to_string());
            return;
        }
    };

    // Raw SQL may use syntax the parser does not know; that is worth a look,
    // not a failure.
    for step in &plan {
        for sql in &step.sql {
            if let Err(e) = adapter.parse(sql) {
                ctx.push(
                    Severity::Warning,
                    Some(dialect),
                    format!("'{}': {}", step.name, e),
                );
            }
        }
    }
}

/// Execute the validate command
pub(crate) async fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let (root, config) = load_config(global)?;
    println!("Validating '{}' in {}", config.name, root.display());

    let mut ctx = ValidationContext::default();
    let required = configured_dialects(&config, &mut ctx);

    let registry = match load_paths(&config.migration_paths_absolute(&root)) {
        Ok(registry) => Some(registry),
        Err(e) => {
            ctx.push(Severity::Error, None, e.to_string());
            None
        }
    };

    if let Some(registry) = &registry {
        if registry.is_empty() {
            ctx.push(Severity::Warning, None, "no migrations found");
        }
        for dialect in Dialect::ALL {
            let adapter = dialect_for(dialect);
            check_dialect(
                registry,
                adapter.as_ref(),
                required.contains(&dialect),
                &mut ctx,
            );
        }
    }

    for issue in &ctx.issues {
        println!("  {}", issue);
    }

    let errors = ctx.count(Severity::Error);
    let warnings = ctx.count(Severity::Warning);
    let migrations = registry.as_ref().map_or(0, Registry::len);
    if errors > 0 || (args.strict && warnings > 0) {
        println!(
            "Validation failed: {} error(s), {} warning(s)",
            errors, warnings
        );
        return Err(ExitCode(1).into());
    }

    println!(
        "Validation passed: {} migration step(s), {} warning(s)",
        migrations, warnings
    );
    Ok(())
}

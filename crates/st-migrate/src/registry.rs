//! Ordered, validated collection of migration steps.

use crate::error::{MigrateError, MigrateResult};
use crate::replace::TableReplace;
use crate::runner::PlannedStep;
use crate::step::{MigrationStep, Operation};
use st_core::Dialect;
use st_sql::SqlDialect;
use std::collections::HashSet;

/// The full migration list, in application order.
///
/// Every step is validated when it is added, so a malformed migration is
/// reported before anything touches the database.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    steps: Vec<MigrationStep>,
    names: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single step.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        operation: impl Into<Operation>,
    ) -> MigrateResult<&mut Self> {
        let step = MigrationStep::new(name, operation)?;
        step.operation
            .validate()
            .map_err(|e| rejected(&step.name, e))?;
        self.push_all(vec![step])?;
        Ok(self)
    }

    /// Register a table replace, expanded into its stage steps.
    pub fn replace_table(
        &mut self,
        name: impl Into<String>,
        replace: TableReplace,
    ) -> MigrateResult<&mut Self> {
        let name = name.into();
        replace.validate().map_err(|e| rejected(&name, e))?;
        let steps = replace.expand(&name)?;
        self.push_all(steps)?;
        Ok(self)
    }

    fn push_all(&mut self, steps: Vec<MigrationStep>) -> MigrateResult<()> {
        let mut incoming = HashSet::new();
        for step in &steps {
            let name = step.name.as_str();
            if self.names.contains(name) || !incoming.insert(name) {
                return Err(MigrateError::Configuration(format!(
                    "duplicate migration name '{}'",
                    name
                )));
            }
        }
        for step in steps {
            self.names.insert(step.name.to_string());
            self.steps.push(step);
        }
        Ok(())
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn get(&self, name: &str) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.name.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check that every step can run on `dialect`.
    pub fn check_dialect(&self, dialect: Dialect) -> MigrateResult<()> {
        for step in &self.steps {
            step.operation
                .check_dialect(dialect)
                .map_err(|e| annotate(&step.name, e))?;
        }
        Ok(())
    }

    /// Render every step for `dialect` without touching a database.
    pub fn render_all(&self, dialect: &dyn SqlDialect) -> MigrateResult<Vec<PlannedStep>> {
        self.steps
            .iter()
            .map(|step| PlannedStep::render(step, dialect))
            .collect()
    }
}

fn rejected(name: &str, err: MigrateError) -> MigrateError {
    match err {
        MigrateError::Configuration(message) => {
            MigrateError::Configuration(format!("migration '{}': {}", name, message))
        }
        other => other,
    }
}

pub(crate) fn annotate(name: &str, err: MigrateError) -> MigrateError {
    MigrateError::MigrationFailed {
        name: name.to_string(),
        source: Box::new(err),
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

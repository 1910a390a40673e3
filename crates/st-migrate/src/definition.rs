//! YAML migration definition files.
//!
//! ```yaml
//! migrations:
//!   - name: create cloud_migration table v1
//!     op: create_table
//!     table:
//!       name: cloud_migration
//!       columns:
//!         - { name: id, type: bigint, primary_key: true, auto_increment: true }
//! ```

use crate::error::{MigrateError, MigrateResult};
use crate::operations::{
    AddColumn, AddIndex, CreateTable, DropIndex, DropTable, PopulateIdentifier, RawSql,
    RenameTable,
};
use crate::registry::Registry;
use crate::replace::TableReplace;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One definition file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationFile {
    #[serde(default)]
    pub migrations: Vec<MigrationDef>,
}

/// A named change.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationDef {
    pub name: String,
    #[serde(flatten)]
    pub change: Change,
}

/// The change a definition declares, selected by its `op` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    CreateTable(CreateTable),
    AddColumn(AddColumn),
    AddIndex(AddIndex),
    DropIndex(DropIndex),
    DropTable(DropTable),
    RenameTable(RenameTable),
    RawSql(RawSql),
    PopulateIdentifier(PopulateIdentifier),
    ReplaceTable(TableReplace),
}

impl MigrationFile {
    pub fn parse(content: &str, path: &Path) -> MigrateResult<Self> {
        serde_yaml::from_str(content).map_err(|e| MigrateError::Definition {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> MigrateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MigrateError::Definition {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Append every migration in this file to `registry`.
    pub fn register(self, registry: &mut Registry) -> MigrateResult<()> {
        for def in self.migrations {
            registry.add_change(def.name, def.change)?;
        }
        Ok(())
    }
}

impl Registry {
    /// Register a change parsed from a definition file.
    pub fn add_change(&mut self, name: String, change: Change) -> MigrateResult<&mut Self> {
        match change {
            Change::CreateTable(op) => self.add(name, op),
            Change::AddColumn(op) => self.add(name, op),
            Change::AddIndex(op) => self.add(name, op),
            Change::DropIndex(op) => self.add(name, op),
            Change::DropTable(op) => self.add(name, op),
            Change::RenameTable(op) => self.add(name, op),
            Change::RawSql(op) => self.add(name, op),
            Change::PopulateIdentifier(op) => self.add(name, op),
            Change::ReplaceTable(replace) => self.replace_table(name, replace),
        }
    }
}

/// `*.yml` / `*.yaml` files directly under `dir`, sorted by file name.
fn definition_files(dir: &Path) -> MigrateResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| MigrateError::Definition {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yml") | Some("yaml")
                )
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Build a registry from every definition file under `paths`, in order.
///
/// Missing directories are skipped with a warning.
pub fn load_paths(paths: &[PathBuf]) -> MigrateResult<Registry> {
    let mut registry = Registry::new();
    for dir in paths {
        if !dir.is_dir() {
            log::warn!("Migration path {} does not exist, skipping", dir.display());
            continue;
        }
        for file in definition_files(dir)? {
            log::debug!("Loading migrations from {}", file.display());
            MigrationFile::load(&file)?.register(&mut registry)?;
        }
    }
    Ok(registry)
}

#[cfg(test)]
#[path = "definition_test.rs"]
mod tests;

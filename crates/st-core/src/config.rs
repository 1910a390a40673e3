//! Configuration types and parsing for strata.yml

use crate::dialect::Dialect;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no `--target` flag is given.
pub const TARGET_ENV_VAR: &str = "STRATA_TARGET";

/// Main project configuration from strata.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Name of the ledger table recording applied migrations
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Migration lock settings
    #[serde(default)]
    pub lock: LockConfig,

    /// Files or directories containing migration definitions
    #[serde(default = "default_migration_paths")]
    pub migration_paths: Vec<String>,

    /// Named target configurations (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...`, `postgres://...`, `mysql://...`)
    #[serde(default = "default_db_url")]
    pub url: String,

    /// Explicit dialect; inferred from the URL scheme when absent
    #[serde(default)]
    pub dialect: Option<Dialect>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            dialect: None,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the active dialect for this connection.
    pub fn dialect(&self) -> CoreResult<Dialect> {
        match self.dialect {
            Some(dialect) => Ok(dialect),
            None => Dialect::from_url(&self.url),
        }
    }

    fn validate(&self, context: &str) -> CoreResult<()> {
        if self.url.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: format!("{context}: database url cannot be empty"),
            });
        }
        let inferred = Dialect::from_url(&self.url).ok();
        match (self.dialect, inferred) {
            (Some(explicit), Some(from_url)) if explicit != from_url => {
                Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{context}: dialect '{explicit}' does not match url scheme ({from_url})"
                    ),
                })
            }
            (None, None) => Err(CoreError::ConfigInvalid {
                message: format!(
                    "{context}: cannot infer dialect from url; set database.dialect"
                ),
            }),
            _ => Ok(()),
        }
    }
}

/// Migration lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lock name shared by every runner against the same database
    #[serde(default = "default_lock_key")]
    pub key: String,

    /// How long to wait for another runner to release the lock (0 = fail fast)
    #[serde(default)]
    pub wait_timeout_secs: u64,

    /// Poll interval while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            key: default_lock_key(),
            wait_timeout_secs: 0,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl LockConfig {
    /// Wait timeout as a `Duration`
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

fn default_db_url() -> String {
    "sqlite://strata.db?mode=rwc".to_string()
}

fn default_ledger_table() -> String {
    "migration_log".to_string()
}

fn default_lock_key() -> String {
    "strata_migrations".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_migration_paths() -> Vec<String> {
    vec!["migrations".to_string()]
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        log::debug!("Loaded config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for strata.yml or strata.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("strata.yml");
        let yaml_path = dir.join("strata.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }
        if !is_identifier(&self.ledger_table) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "ledger_table '{}' must contain only letters, digits, and underscores",
                    self.ledger_table
                ),
            });
        }
        if self.lock.key.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lock.key cannot be empty".to_string(),
            });
        }
        if self.migration_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one migration_paths entry must be specified".to_string(),
            });
        }

        self.database.validate("database")?;
        for (name, target) in &self.targets {
            if let Some(database) = &target.database {
                database.validate(&format!("targets.{name}.database"))?;
            }
        }
        Ok(())
    }

    /// Migration paths resolved against the project root
    pub fn migration_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.migration_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Names of all configured targets, sorted
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get database configuration, optionally applying target overrides
    ///
    /// If target is specified and exists, uses target's database config.
    /// Otherwise, uses the base database config.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => {
                let target_config =
                    self.targets
                        .get(name)
                        .ok_or_else(|| CoreError::ConfigInvalid {
                            message: format!(
                                "Target '{}' not found. Available targets: {}",
                                name,
                                self.available_targets().join(", ")
                            ),
                        })?;

                Ok(target_config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.database.clone()))
            }
            None => Ok(self.database.clone()),
        }
    }

    /// Resolve target from CLI flag or STRATA_TARGET environment variable
    ///
    /// Priority: CLI flag > STRATA_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

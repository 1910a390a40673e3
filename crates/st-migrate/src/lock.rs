//! Exclusive migration lock held for the duration of a run.

use crate::error::{MigrateError, MigrateResult};
use st_core::LockConfig;
use st_db::Database;
use std::time::Duration;
use tokio::time::Instant;

/// How the runner takes the migration lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    pub key: String,
    /// Zero fails immediately when the lock is held elsewhere
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self::from(&LockConfig::default())
    }
}

impl From<&LockConfig> for LockOptions {
    fn from(config: &LockConfig) -> Self {
        Self {
            key: config.key.clone(),
            wait_timeout: config.wait_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// A held lock. Call [`MigrationLock::release`] on every exit path.
pub struct MigrationLock<'a> {
    db: &'a dyn Database,
    key: String,
}

impl<'a> MigrationLock<'a> {
    /// Take the lock, polling until `wait_timeout` elapses.
    pub async fn acquire(db: &'a dyn Database, options: &LockOptions) -> MigrateResult<Self> {
        let started = Instant::now();
        let mut warned = false;
        loop {
            if db.try_lock(&options.key).await? {
                log::debug!("Acquired migration lock '{}'", options.key);
                return Ok(Self {
                    db,
                    key: options.key.clone(),
                });
            }

            let waited = started.elapsed();
            if waited >= options.wait_timeout {
                return Err(MigrateError::LockAcquisition {
                    key: options.key.clone(),
                    waited_secs: waited.as_secs(),
                });
            }
            if !warned {
                log::warn!(
                    "Migration lock '{}' is held by another process, waiting up to {}s",
                    options.key,
                    options.wait_timeout.as_secs()
                );
                warned = true;
            }
            let remaining = options.wait_timeout - waited;
            tokio::time::sleep(options.poll_interval.min(remaining)).await;
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(self) -> MigrateResult<()> {
        self.db.unlock(&self.key).await?;
        log::debug!("Released migration lock '{}'", self.key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;

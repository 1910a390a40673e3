//! Unlock command implementation

use anyhow::{Context, Result};
use st_db::DatabaseLock;

use crate::cli::{GlobalArgs, UnlockArgs};
use crate::commands::common::{self, load_config};

/// Execute the unlock command
pub(crate) async fn execute(args: &UnlockArgs, global: &GlobalArgs) -> Result<()> {
    let (_, config) = load_config(global)?;
    let key = args.key.as_deref().unwrap_or(&config.lock.key);
    let db = common::connect(&config, global).await?;

    let released = db
        .force_unlock(key)
        .await
        .with_context(|| format!("Failed to release lock '{}'", key))?;
    if released {
        log::warn!("Forcibly released migration lock '{}'", key);
        println!("Released lock '{}'", key);
    } else {
        println!("No lock held for '{}'", key);
    }
    Ok(())
}

//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use st_core::Dialect;

/// Strata - versioned schema migrations for SQLite, Postgres and MySQL
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Apply pending migrations
    Up(UpArgs),

    /// Print the SQL that would run
    Plan(PlanArgs),

    /// Check migration definitions without touching a database
    Validate(ValidateArgs),

    /// Release a migration lock left behind by a dead process
    Unlock(UnlockArgs),
}

/// Output formats for listing commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table
    Table,
    /// JSON array
    Json,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Apply at most N pending migrations
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Render for this dialect instead of the configured one
    #[arg(short, long, requires = "all")]
    pub dialect: Option<Dialect>,

    /// Render every registered migration without consulting the ledger
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the unlock command
#[derive(Args, Debug)]
pub struct UnlockArgs {
    /// Lock key to release (defaults to lock.key from the config)
    #[arg(short, long)]
    pub key: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

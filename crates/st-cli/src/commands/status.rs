//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use st_migrate::{Runner, StepState, StepStatus};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{self, load_project};

/// One status row as printed in JSON output
#[derive(Debug, Serialize)]
struct StatusRow {
    name: String,
    state: String,
    applied_at: Option<String>,
}

impl From<&StepStatus> for StatusRow {
    fn from(status: &StepStatus) -> Self {
        Self {
            name: status.name.to_string(),
            state: status.state.to_string(),
            applied_at: status
                .applied_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let db = common::connect(&project.config, global).await?;
    let options = common::runner_options(&project.config, None)?;
    let runner = Runner::new(&*db, &project.registry, options);

    let statuses = runner
        .status()
        .await
        .context("Failed to read migration ledger")?;
    let rows: Vec<StatusRow> = statuses.iter().map(StatusRow::from).collect();

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => print_table(&rows),
    }
    Ok(())
}

fn print_table(rows: &[StatusRow]) {
    let applied = rows
        .iter()
        .filter(|r| r.state == StepState::Applied.to_string())
        .count();

    println!("{:<8}  {:<19}  NAME", "STATE", "APPLIED AT");
    for row in rows {
        println!(
            "{:<8}  {:<19}  {}",
            row.state,
            row.applied_at.as_deref().unwrap_or("-"),
            row.name
        );
    }
    println!();
    println!(
        "{} applied, {} pending ({} total)",
        applied,
        rows.len() - applied,
        rows.len()
    );
}

//! Up command implementation

use anyhow::{Context, Result};
use st_migrate::{Runner, StepState};

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::{self, load_project};

/// Execute the up command
pub(crate) async fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let db = common::connect(&project.config, global).await?;
    let options = common::runner_options(&project.config, args.steps)?;
    let runner = Runner::new(&*db, &project.registry, options);

    log::info!(
        "Migrating '{}' on {}",
        project.config.name,
        runner.dialect().name()
    );

    let report = runner
        .run_with(|step, state| match state {
            StepState::Applied => println!("  ok      {}", step.name),
            StepState::Failed => println!("  FAILED  {}", step.name),
            StepState::Pending | StepState::Running => {}
        })
        .await
        .context("Migration run failed")?;

    println!();
    if report.applied.is_empty() {
        println!(
            "Nothing to apply ({} migration(s) already applied)",
            report.skipped
        );
    } else {
        println!(
            "Applied {} migration(s), {} already applied",
            report.applied.len(),
            report.skipped
        );
    }
    Ok(())
}

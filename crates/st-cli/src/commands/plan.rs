//! Plan command implementation

use anyhow::{Context, Result};
use st_migrate::Runner;
use st_sql::dialect_for;

use crate::cli::{GlobalArgs, PlanArgs};
use crate::commands::common::{self, load_project, print_plan};

/// Execute the plan command
///
/// `--all` renders the full registry offline; otherwise the ledger decides
/// what is pending and the connected database picks the dialect.
pub(crate) async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;

    if args.all {
        let dialect = match args.dialect {
            Some(dialect) => dialect,
            None => {
                let target = st_core::Config::resolve_target(global.target.as_deref());
                project
                    .config
                    .get_database_config(target.as_deref())?
                    .dialect()?
            }
        };
        let adapter = dialect_for(dialect);
        let plan = project
            .registry
            .render_all(adapter.as_ref())
            .with_context(|| format!("Failed to render migrations for {}", dialect))?;
        print_plan(&plan, adapter.as_ref());
        return Ok(());
    }

    let db = common::connect(&project.config, global).await?;
    let options = common::runner_options(&project.config, None)?;
    let runner = Runner::new(&*db, &project.registry, options);
    let plan = runner.plan().await.context("Failed to plan migrations")?;
    print_plan(&plan, runner.dialect());
    Ok(())
}

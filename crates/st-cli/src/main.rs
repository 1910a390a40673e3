//! Strata CLI - versioned, cross-dialect schema migrations

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{plan, status, unlock, up, validate};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        Commands::Status(args) => status::execute(args, &cli.global).await,
        Commands::Up(args) => up::execute(args, &cli.global).await,
        Commands::Plan(args) => plan::execute(args, &cli.global).await,
        Commands::Validate(args) => validate::execute(args, &cli.global).await,
        Commands::Unlock(args) => unlock::execute(args, &cli.global).await,
    };

    if let Err(err) = result {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            std::process::exit(code.0);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

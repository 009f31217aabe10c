// ABOUTME: Entry point for the relay CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::AppTarget;
use relay::error::Result;
use relay::logging::{self, Verbosity};
use relay::output::{Output, OutputMode};
use std::env;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputMode::from_flags(cli.json, cli.quiet));

    let log_dir = cli
        .command
        .logged_config_file()
        .and_then(|file| AppTarget::resolve(file).ok())
        .map(|target| target.layout.logs_dir());
    let guard = logging::init(
        Verbosity::from_flags(cli.verbose, cli.quiet),
        log_dir.as_deref(),
    );

    let result = run(cli.command, output).await;

    // Flush the log file before exiting.
    drop(guard);

    if let Err(e) = result {
        Output::new(OutputMode::from_flags(cli.json, cli.quiet)).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: Output) -> Result<()> {
    match command {
        Commands::Init {
            name,
            repo,
            branch,
            force,
        } => {
            let cwd = env::current_dir()?;
            commands::init(
                &cwd,
                &name,
                repo.as_deref(),
                branch.as_deref(),
                force,
                output,
            )
        }
        Commands::Run { file, force } => {
            commands::run(AppTarget::resolve(&file)?, force, output).await
        }
        Commands::Rollback { file } => commands::rollback(AppTarget::resolve(&file)?, output),
        Commands::Status { file } => commands::status(AppTarget::resolve(&file)?, output),
        Commands::Unlock { file } => commands::unlock(AppTarget::resolve(&file)?, output),
    }
}

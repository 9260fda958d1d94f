//! volsmoke CLI entry point.
//!
//! Loads configuration, installs logging, dispatches the subcommand and
//! maps the outcome to a process exit code.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use volsmoke_core::config::VolsmokeConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // config validate는 로딩 실패 자체를 리포트로 렌더링해야 함
    let config = match &cli.command {
        Commands::Config(_) => None,
        Commands::Run(_) => Some(VolsmokeConfig::load_or_default(&cli.config).await?),
    };

    let mut general = config
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("warning: {e:#}");
    }

    volsmoke_core::metrics::describe_all();
    tracing::debug!(config = %cli.config.display(), "volsmoke starting");

    match cli.command {
        Commands::Run(args) => {
            let config = config.unwrap_or_default();
            commands::run::execute(args, config, &writer).await
        }
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

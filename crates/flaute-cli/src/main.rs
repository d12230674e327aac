use std::process::ExitCode;

use clap::Parser;
use flaute_batch::RunSummary;
use flaute_cli::cli::{Cli, Commands};
use flaute_cli::config::FlauteConfig;
use flaute_core::FlauteError;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install the log subscriber");
    }

    match run(&cli) {
        Ok(Some(summary)) if summary.has_fatal() => {
            error!("run hit a precondition violation");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = %FlauteError::classify(&err), "{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Option<RunSummary>> {
    let config = FlauteConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Commands::Stats { selection, run } => {
            commands::stats::handle(&config, selection, run).map(Some)
        }
        Commands::Derive { member, run } => {
            commands::derive::handle(&config, member, run).map(Some)
        }
        Commands::Plan {
            selection,
            overwrite,
        } => commands::plan::handle(&config, selection, *overwrite).map(|()| None),
    }
}

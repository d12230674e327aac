use anyhow::Result;
use flaute_batch::{run_stats, RunSummary};
use flaute_cli::cli::{RunArgs, Selection};
use flaute_cli::config::FlauteConfig;
use flaute_io::TimeWindows;
use tracing::info;

use crate::commands::util::{collaborators, print_summary, run_overrides, stats_config};

pub fn handle(config: &FlauteConfig, selection: &Selection, run: &RunArgs) -> Result<RunSummary> {
    let (processes, overwrite) = run_overrides(run);
    let stats = stats_config(config, selection, processes, overwrite)?;
    let windows = TimeWindows::load(&config.paths.time_windows)?;
    info!(
        variant = %stats.variant,
        regions = stats.regions.len(),
        workers = stats.workers,
        "starting statistics run"
    );
    let summary = run_stats(&stats, &windows, &collaborators(config)?)?;
    print_summary(&format!("stats {}", stats.variant), &summary);
    Ok(summary)
}

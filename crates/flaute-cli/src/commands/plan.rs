use anyhow::Result;
use flaute_batch::plan_stats;
use flaute_cli::cli::Selection;
use flaute_cli::config::FlauteConfig;
use flaute_io::TimeWindows;

use crate::commands::util::stats_config;

pub fn handle(config: &FlauteConfig, selection: &Selection, overwrite: bool) -> Result<()> {
    let stats = stats_config(config, selection, None, overwrite)?;
    let windows = TimeWindows::load(&config.paths.time_windows)?;
    let (_, plan) = plan_stats(&stats, &windows)?;
    println!(
        "plan {}: {} task(s), {} already stored",
        stats.variant,
        plan.tasks.len(),
        plan.skipped
    );
    for task in &plan.tasks {
        println!(
            "  {}\t{}\t{}\t{}..{}",
            task.key,
            task.dataset.resolution,
            task.dataset.path.display(),
            task.window.start_year,
            task.window.end_year
        );
    }
    Ok(())
}

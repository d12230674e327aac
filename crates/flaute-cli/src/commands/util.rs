use std::sync::Arc;

use anyhow::Result;
use flaute_algo::Turbine;
use flaute_batch::{Collaborators, CommandTool, RunSummary, StatsConfig, StatsVariant};
use flaute_cli::cli::{RunArgs, Selection, TransformArg};
use flaute_cli::config::FlauteConfig;
use flaute_core::FlauteError;
use flaute_io::{LookupTables, TableLookup};
use tracing::warn;

/// Resolve the statistic variant from the command-line selection.
pub fn variant(selection: &Selection) -> Result<StatsVariant> {
    let variable = selection.variable.clone();
    let variant = match (selection.transform, selection.turbine) {
        (Some(TransformArg::WindCf), Some(turbine)) => {
            if variable != "sfcWind" {
                return Err(FlauteError::Config(format!(
                    "the wind-cf transform reads sfcWind, not {variable}"
                ))
                .into());
            }
            StatsVariant::WindCapacity { turbine }
        }
        (Some(TransformArg::WindCf), None) => {
            return Err(FlauteError::Config(format!(
                "the wind-cf transform needs --turbine ({})",
                turbine_names()
            ))
            .into())
        }
        (None, Some(turbine)) => StatsVariant::Turbine { variable, turbine },
        (None, None) => StatsVariant::Raw { variable },
    };
    Ok(variant)
}

fn turbine_names() -> String {
    Turbine::ALL
        .iter()
        .map(Turbine::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn stats_config(
    config: &FlauteConfig,
    selection: &Selection,
    processes: Option<usize>,
    overwrite: bool,
) -> Result<StatsConfig> {
    let regions = if selection.regions.is_empty() {
        config.run.regions.clone()
    } else {
        selection.regions.clone()
    };
    Ok(StatsConfig {
        variant: variant(selection)?,
        data_root: config.paths.data_root.clone(),
        output_dir: config.paths.output_dir.clone(),
        scratch_dir: config.paths.scratch_dir.clone(),
        regions,
        bins: config.bin_spec()?,
        regime: config.regime(),
        tool: config.tool_settings(),
        batch_size: config.run.batch_size,
        overwrite: overwrite || config.run.overwrite,
        workers: config.processes(processes),
    })
}

pub fn run_overrides(run: &RunArgs) -> (Option<usize>, bool) {
    (run.processes, run.overwrite)
}

/// Region lookup and external tool for this configuration. A missing lookup
/// file is only an error once a region is actually looked up.
pub fn collaborators(config: &FlauteConfig) -> Result<Collaborators> {
    let path = &config.paths.lookup;
    let lookup = if path.exists() {
        TableLookup::load(path)?
    } else {
        warn!(lookup = %path.display(), "region lookup file not found, using empty tables");
        TableLookup::new(LookupTables::default(), ".")
    };
    Ok(Collaborators {
        lookup: Arc::new(lookup),
        tool: Arc::new(CommandTool::new()),
    })
}

pub fn print_summary(title: &str, summary: &RunSummary) {
    println!(
        "{title}: {} succeeded, {} failed, {} skipped",
        summary.success, summary.failure, summary.skipped
    );
    let empty = summary.empty_slices();
    if empty > 0 {
        println!("  {empty} empty slice(s) reported, see the manifest");
    }
    for record in summary.failed() {
        let kind = record
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  ✗ {} [{kind}] {}",
            record.key,
            record.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("Manifest: {}", summary.manifest_path.display());
}

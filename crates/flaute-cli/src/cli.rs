use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use flaute_algo::Turbine;

#[derive(Parser, Debug)]
#[command(name = "flaute", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// TOML configuration file (defaults to ./flaute.toml when present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute per-region, per-scenario, per-season statistics
    Stats {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Derive wind, capacity-factor and Dunkelflaute files for one member
    Derive {
        /// JSON file listing the member's ua100m, va100m, tas and rsds files
        #[arg(long, value_hint = ValueHint::FilePath)]
        member: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the tasks a statistics run would schedule, without running them
    Plan {
        #[command(flatten)]
        selection: Selection,
        /// Recompute keys already in the store
        #[arg(long)]
        overwrite: bool,
    },
}

/// Which statistics to compute.
#[derive(Args, Debug, Clone)]
pub struct Selection {
    /// Variable to aggregate (sfcWind, CF_PV, CF_Wind, Dunkelflaute, ...)
    #[arg(long, default_value = "sfcWind")]
    pub variable: String,
    /// Turbine subdirectory for per-turbine variables
    #[arg(long)]
    pub turbine: Option<Turbine>,
    /// Transform applied to each slice before aggregation
    #[arg(long, value_enum)]
    pub transform: Option<TransformArg>,
    /// Regions to process (repeatable or comma separated)
    #[arg(long = "region", value_delimiter = ',')]
    pub regions: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Worker count; 0 uses every CPU
    #[arg(long)]
    pub processes: Option<usize>,
    /// Recompute results that already exist
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformArg {
    /// Turn wind speed into capacity factor with the turbine's power curve
    WindCf,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

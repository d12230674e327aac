use std::fmt;
use std::path::{Path, PathBuf};

use flaute_algo::{AggregateOptions, BinSpec, RegimeThresholds, SliceTransform, Turbine};
use serde::{Deserialize, Serialize};

/// Which files a statistics run reads, how slices are transformed and
/// where results are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StatsVariant {
    /// A variable stored directly per region (`sfcWind`, `CF_PV`, `rsds`, ...).
    Raw { variable: String },
    /// A per-turbine variable (`CF_Wind`, `Dunkelflaute`).
    Turbine { variable: String, turbine: Turbine },
    /// `sfcWind` files turned into capacity factor inside each task.
    WindCapacity { turbine: Turbine },
}

impl StatsVariant {
    /// Variable column read from the input files.
    pub fn input_variable(&self) -> &str {
        match self {
            StatsVariant::Raw { variable } | StatsVariant::Turbine { variable, .. } => variable,
            StatsVariant::WindCapacity { .. } => "sfcWind",
        }
    }

    /// `<data_root>/<region>/<variable>[/<turbine>]`
    pub fn input_dir(&self, data_root: &Path, region: &str) -> PathBuf {
        let dir = data_root.join(region).join(self.input_variable());
        match self {
            StatsVariant::Turbine { turbine, .. } => dir.join(turbine.as_str()),
            _ => dir,
        }
    }

    /// Directory holding one result document per region.
    pub fn store_dir(&self, output_dir: &Path) -> PathBuf {
        match self {
            StatsVariant::Raw { variable } => output_dir.join(variable),
            StatsVariant::Turbine { variable, turbine } => {
                output_dir.join(variable).join(turbine.as_str())
            }
            StatsVariant::WindCapacity { turbine } => {
                output_dir.join("sfcWind_CF").join(turbine.as_str())
            }
        }
    }

    pub fn transform(&self) -> SliceTransform {
        match self {
            StatsVariant::WindCapacity { turbine } => SliceTransform::WindCapacity {
                turbine: *turbine,
            },
            _ => SliceTransform::Identity,
        }
    }

    /// The operating-regime breakdown only applies to raw wind speed.
    pub fn aggregate_options(&self, bins: BinSpec, regime: RegimeThresholds) -> AggregateOptions {
        let regime = matches!(self, StatsVariant::Raw { variable } if variable == "sfcWind")
            .then_some(regime);
        AggregateOptions { bins, regime }
    }
}

impl fmt::Display for StatsVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsVariant::Raw { variable } => f.write_str(variable),
            StatsVariant::Turbine { variable, turbine } => write!(f, "{variable}/{turbine}"),
            StatsVariant::WindCapacity { turbine } => write!(f, "sfcWind_CF/{turbine}"),
        }
    }
}

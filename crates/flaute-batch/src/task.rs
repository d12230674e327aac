//! Task graph: one task per (region, dataset, scenario) still missing from
//! the result store.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use flaute_core::{clean_name, DatasetReference, FlauteResult, Resolution, Season, TimeWindow};
use flaute_io::TimeWindows;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{ResultStore, StoreKey};
use crate::variant::StatsVariant;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub region: String,
    pub cleaned: String,
    pub scenario: String,
}

impl TaskKey {
    pub fn store_key(&self, season: Season) -> StoreKey {
        StoreKey {
            region: self.region.clone(),
            cleaned: self.cleaned.clone(),
            scenario: self.scenario.clone(),
            season,
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.cleaned, self.scenario)
    }
}

/// A self-contained unit of statistics work. Each task computes every
/// [`Season`] of its scenario.
#[derive(Debug, Clone, Serialize)]
pub struct StatsTask {
    pub key: TaskKey,
    pub dataset: DatasetReference,
    pub window: TimeWindow,
    pub variant: StatsVariant,
}

impl StatsTask {
    /// Identity that names the task's scratch namespace. Variants reading
    /// the same file (raw wind, capacity factor per turbine) stay apart.
    pub fn identity(&self) -> String {
        format!(
            "{}#{}#{}",
            self.variant,
            self.dataset.path.display(),
            self.key.scenario
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskPlan {
    pub tasks: Vec<StatsTask>,
    /// Scenario tasks already present in the store.
    pub skipped: usize,
}

/// Enumerate the tasks that still have to run.
///
/// **Algorithm:**
/// 1. For each region and each dataset file in `windows`, derive the
///    cleaned name shared by all scenario spellings of the file.
/// 2. Unless `overwrite` is set, skip the dataset when the stored scenarios
///    are a superset of those required now, and skip each scenario that is
///    already stored.
/// 3. Emit one [`StatsTask`] per remaining scenario.
///
/// A file name without a known resolution tag is a precondition violation
/// and aborts planning.
pub fn build_tasks(
    regions: &[String],
    windows: &TimeWindows,
    store: &ResultStore,
    variant: &StatsVariant,
    data_root: &Path,
    overwrite: bool,
) -> FlauteResult<TaskPlan> {
    let mut plan = TaskPlan::default();
    for region in regions {
        let input_dir = variant.input_dir(data_root, region);
        for (file_name, scenarios) in windows.iter() {
            let resolution = Resolution::detect(file_name)?;
            let cleaned = clean_name(file_name);
            let stored = store.scenarios(region, &cleaned);
            let required: BTreeSet<String> = scenarios.keys().cloned().collect();

            if !overwrite && stored.is_superset(&required) {
                debug!(%region, %cleaned, "already complete");
                plan.skipped += required.len();
                continue;
            }

            for (scenario, window) in scenarios {
                if !overwrite && stored.contains(scenario) {
                    plan.skipped += 1;
                    continue;
                }
                plan.tasks.push(StatsTask {
                    key: TaskKey {
                        region: region.clone(),
                        cleaned: cleaned.clone(),
                        scenario: scenario.clone(),
                    },
                    dataset: DatasetReference {
                        region: region.clone(),
                        variable: variant.input_variable().to_string(),
                        scenario: scenario.clone(),
                        resolution,
                        path: input_dir.join(file_name),
                    },
                    window: *window,
                    variant: variant.clone(),
                });
            }
        }
    }
    Ok(plan)
}

//! Statistics run: plan, execute on the pool, merge and persist.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flaute_algo::{aggregate, AggregateOptions, BinSpec, RegimeThresholds, SliceTransform};
use flaute_core::{FlauteError, GridDataset, Season};
use flaute_io::staging::commit_staged;
use flaute_io::{read_grid, staged_path, write_grid, TimeWindows};
use flaute_ts::{select_window, split_by_season};
use tracing::{debug, info, warn};

use crate::context::{Collaborators, ToolSettings};
use crate::external::{expect_output, ExternalTool};
use crate::manifest::{finish_run, RunSummary, TaskRecord};
use crate::runner::{Keyed, WorkerPool};
use crate::scratch::ScratchSpace;
use crate::store::{ResultStore, SliceResult};
use crate::task::{build_tasks, StatsTask, TaskKey, TaskPlan};
use crate::variant::StatsVariant;

pub const MANIFEST_FILE: &str = "run_manifest.json";

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub variant: StatsVariant,
    pub data_root: PathBuf,
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub regions: Vec<String>,
    pub bins: BinSpec,
    pub regime: RegimeThresholds,
    pub tool: ToolSettings,
    /// Merged tasks between two persists of the store.
    pub batch_size: usize,
    pub overwrite: bool,
    pub workers: usize,
}

impl Keyed for StatsTask {
    type Key = TaskKey;

    fn key(&self) -> TaskKey {
        self.key.clone()
    }
}

/// Result of one task: every season that had data, plus the seasons that
/// did not.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub seasons: BTreeMap<Season, SliceResult>,
    pub empty: Vec<Season>,
}

/// Shared, read-only state of the workers.
struct StatsContext<'a> {
    store_dir: PathBuf,
    scratch_dir: &'a Path,
    transform: SliceTransform,
    options: AggregateOptions,
    tool: &'a dyn ExternalTool,
    settings: &'a ToolSettings,
    /// Regenerate product files that already exist.
    overwrite: bool,
}

/// Load the store and enumerate what is left to do.
pub fn plan_stats(config: &StatsConfig, windows: &TimeWindows) -> Result<(ResultStore, TaskPlan)> {
    let store_dir = config.variant.store_dir(&config.output_dir);
    let store = ResultStore::load(&store_dir, &config.regions, &config.bins.stored_edges())?;
    let plan = build_tasks(
        &config.regions,
        windows,
        &store,
        &config.variant,
        &config.data_root,
        config.overwrite,
    )?;
    Ok((store, plan))
}

/// Run the statistics pipeline for one variant.
///
/// Fatal preconditions (changed histogram edges, unknown resolution) abort
/// before any task starts. Task failures are recorded in the summary and
/// leave their keys absent from the store, so the next run retries them.
pub fn run_stats(
    config: &StatsConfig,
    windows: &TimeWindows,
    collaborators: &Collaborators,
) -> Result<RunSummary> {
    let (mut store, plan) = plan_stats(config, windows)?;
    info!(
        variant = %config.variant,
        tasks = plan.tasks.len(),
        skipped = plan.skipped,
        "planned statistics run"
    );

    let ctx = StatsContext {
        store_dir: store.dir().to_path_buf(),
        scratch_dir: &config.scratch_dir,
        transform: config.variant.transform(),
        options: config.variant.aggregate_options(config.bins, config.regime),
        tool: collaborators.tool.as_ref(),
        settings: &config.tool,
        overwrite: config.overwrite,
    };
    let batch_size = config.batch_size.max(1);
    let mut records = Vec::with_capacity(plan.tasks.len());
    let mut since_persist = 0usize;

    let pool = WorkerPool::new(config.workers)?;
    debug!(workers = pool.workers(), "statistics pool ready");
    pool.run(
        plan.tasks,
        |task| execute_task(task, &ctx),
        |outcome| {
            match outcome.result {
                Ok(output) => {
                    for (season, result) in output.seasons {
                        store.merge(&outcome.key.store_key(season), result);
                    }
                    records.push(TaskRecord::ok(outcome.key.to_string(), output.empty));
                    since_persist += 1;
                    if since_persist >= batch_size {
                        store.persist()?;
                        since_persist = 0;
                    }
                }
                Err(err) => records.push(TaskRecord::failed(outcome.key.to_string(), &err)),
            }
            Ok(())
        },
    )?;
    store.persist()?;

    let summary = finish_run(
        &store.dir().join(MANIFEST_FILE),
        "stats",
        &config.variant.to_string(),
        plan.skipped,
        records,
    )?;
    info!(
        success = summary.success,
        failure = summary.failure,
        skipped = summary.skipped,
        "statistics run finished"
    );
    Ok(summary)
}

/// Compute every season of one task.
///
/// **Algorithm:**
/// 1. Read the dataset and keep the scenario's time window.
/// 2. Apply the variant's transform (e.g. power curve).
/// 3. Split into `Year` and the four seasons and aggregate each; seasons
///    without valid samples are reported, not stored.
/// 4. Materialise the configured tool products per season.
fn execute_task(task: &StatsTask, ctx: &StatsContext<'_>) -> Result<TaskOutput> {
    let dataset = &task.dataset;
    debug!(key = %task.key, resolution = %dataset.resolution, "executing task");
    let raw = read_grid(&dataset.path, &dataset.variable)
        .with_context(|| format!("reading {}", dataset.path.display()))?;
    let windowed = select_window(&raw, task.window.start()?, task.window.end()?)?;
    let data = ctx.transform.apply(windowed);

    let scratch = if ctx.settings.products.is_empty() {
        None
    } else {
        Some(ScratchSpace::create(ctx.scratch_dir, &task.identity())?)
    };

    let mut output = TaskOutput {
        seasons: BTreeMap::new(),
        empty: Vec::new(),
    };
    for (season, slice) in split_by_season(&data) {
        let stats = match aggregate(&slice, &ctx.options) {
            Ok(stats) => stats,
            Err(FlauteError::EmptySlice(msg)) => {
                warn!(key = %task.key, %season, "empty slice: {msg}");
                output.empty.push(season);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let products = match &scratch {
            Some(scratch) => materialise_products(task, season, &slice, scratch, ctx)?,
            None => BTreeMap::new(),
        };
        output.seasons.insert(season, SliceResult { stats, products });
    }
    Ok(output)
}

/// `<store_dir>/<region>/<product>/<cleaned>_<scenario>_<season>.csv`
pub fn product_path(store_dir: &Path, key: &TaskKey, product: &str, season: Season) -> PathBuf {
    store_dir
        .join(&key.region)
        .join(product)
        .join(format!("{}_{}_{}.csv", key.cleaned, key.scenario, season))
}

fn materialise_products(
    task: &StatsTask,
    season: Season,
    slice: &GridDataset,
    scratch: &ScratchSpace,
    ctx: &StatsContext<'_>,
) -> Result<BTreeMap<String, PathBuf>> {
    let mut products = BTreeMap::new();
    let mut input: Option<PathBuf> = None;
    for spec in &ctx.settings.products {
        let path = product_path(&ctx.store_dir, &task.key, &spec.name, season);
        if ctx.overwrite || !path.exists() {
            let source = match input.clone() {
                Some(source) => source,
                None => {
                    let file = scratch.file(&format!("{season}.csv"));
                    write_grid(slice, &file)?;
                    input = Some(file.clone());
                    file
                }
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let staged = staged_path(&path);
            let command = spec.command(&ctx.settings.program, &source, &staged);
            let outcome = ctx.tool.run(&command, ctx.settings.timeout)?;
            expect_output(outcome, &command, ctx.settings.timeout, &staged)?;
            commit_staged(&staged, &path)?;
        }
        products.insert(spec.name.clone(), path);
    }
    Ok(products)
}

//! Derivation of wind speed, capacity factors and Dunkelflaute files for one
//! model-run member.
//!
//! **Algorithm:**
//! 1. Check that the paired input lists have matching lengths and that
//!    neither the wind nor the solar side is empty.
//! 2. Skip the member when every output exists (unless overwriting).
//! 3. Fan out one chunk task per input file index: crop and mask to the
//!    region, compute `sfcWind` and `CF_Wind` per turbine, or `CF_PV`. Chunk
//!    results go to a digest-named scratch directory.
//! 4. Fan in: concatenate chunks in index order into the final files and
//!    compute `Dunkelflaute` per turbine from them.
//!
//! A failed chunk fails the member; no final file is written for it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flaute_algo::{capacity_factor_grid, compound_low_output, wind_products, Turbine};
use flaute_core::{FlauteError, FlauteResult, GridDataset, IndexBox, Resolution};
use flaute_io::{read_grid, read_json, write_grid, Mask};
use flaute_ts::{concat_time, select_region};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::Collaborators;
use crate::manifest::{finish_run, RunSummary, TaskRecord};
use crate::runner::{Keyed, WorkerPool};
use crate::scratch::ScratchSpace;

/// Input files of one member, each list sorted by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInputs {
    pub region: String,
    /// Prefix of every output file name.
    pub stem: String,
    pub ua100m: Vec<PathBuf>,
    pub va100m: Vec<PathBuf>,
    pub tas: Vec<PathBuf>,
    pub rsds: Vec<PathBuf>,
}

impl MemberInputs {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path).with_context(|| format!("loading member inputs '{}'", path.display()))
    }

    /// Validate the pairing of the input lists and detect the resolution.
    pub fn check(&self) -> FlauteResult<Resolution> {
        if self.ua100m.len() != self.va100m.len() {
            return Err(FlauteError::Precondition(format!(
                "{}: {} ua100m files but {} va100m files",
                self.stem,
                self.ua100m.len(),
                self.va100m.len()
            )));
        }
        if self.tas.len() != self.rsds.len() {
            return Err(FlauteError::Precondition(format!(
                "{}: {} tas files but {} rsds files",
                self.stem,
                self.tas.len(),
                self.rsds.len()
            )));
        }
        // Every output needs both sides: Dunkelflaute combines wind and PV.
        let (Some(wind), Some(_)) = (self.ua100m.first(), self.tas.first()) else {
            return Err(FlauteError::Precondition(format!(
                "{}: {} wind and {} solar input files, both sides are required",
                self.stem,
                self.ua100m.len(),
                self.tas.len()
            )));
        };
        Resolution::detect(&wind.to_string_lossy())
    }

    pub fn identity(&self) -> String {
        format!("{}/{}", self.region, self.stem)
    }
}

/// Final files of one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedOutputs {
    pub wind: PathBuf,
    pub cf_wind: BTreeMap<Turbine, PathBuf>,
    pub cf_pv: PathBuf,
    pub dunkelflaute: BTreeMap<Turbine, PathBuf>,
}

impl DerivedOutputs {
    pub fn for_member(output_dir: &Path, stem: &str) -> Self {
        let per_turbine = |variable: &str| {
            Turbine::ALL
                .iter()
                .map(|t| {
                    let path = output_dir
                        .join(variable)
                        .join(t.as_str())
                        .join(format!("{stem}_{variable}.csv"));
                    (*t, path)
                })
                .collect()
        };
        Self {
            wind: output_dir.join("Wind").join(format!("{stem}_wind.csv")),
            cf_wind: per_turbine("CF_Wind"),
            cf_pv: output_dir.join("CF_PV").join(format!("{stem}_CF_PV.csv")),
            dunkelflaute: per_turbine("Dunkelflaute"),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.wind)
            .chain(self.cf_wind.values())
            .chain(std::iter::once(&self.cf_pv))
            .chain(self.dunkelflaute.values())
    }

    pub fn all_exist(&self) -> bool {
        self.paths().all(|p| p.exists())
    }
}

#[derive(Debug, Clone)]
pub struct DeriveConfig {
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub overwrite: bool,
    /// Capacity factor below which a source counts as not producing.
    pub low_output: f64,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct DeriveReport {
    pub outputs: DerivedOutputs,
    /// False when the member was already complete.
    pub written: bool,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
enum ChunkTask {
    Wind {
        index: usize,
        ua100m: PathBuf,
        va100m: PathBuf,
    },
    Pv {
        index: usize,
        tas: PathBuf,
        rsds: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChunkKey {
    side: &'static str,
    index: usize,
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:03}", self.side, self.index)
    }
}

impl Keyed for ChunkTask {
    type Key = ChunkKey;

    fn key(&self) -> ChunkKey {
        match self {
            ChunkTask::Wind { index, .. } => ChunkKey {
                side: "wind",
                index: *index,
            },
            ChunkTask::Pv { index, .. } => ChunkKey {
                side: "pv",
                index: *index,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum ChunkFiles {
    Wind {
        wind: PathBuf,
        cf_wind: BTreeMap<Turbine, PathBuf>,
    },
    Pv {
        cf_pv: PathBuf,
    },
}

struct ChunkContext<'a> {
    index_box: IndexBox,
    mask: Mask,
    scratch: &'a ScratchSpace,
}

impl ChunkContext<'_> {
    fn read_region(&self, path: &Path, variable: &str) -> Result<GridDataset> {
        let raw = read_grid(path, variable)
            .with_context(|| format!("reading {variable} from {}", path.display()))?;
        Ok(select_region(&raw, &self.index_box, &self.mask)?)
    }
}

/// Derive every output of one member.
pub fn run_derive(
    member: &MemberInputs,
    config: &DeriveConfig,
    collaborators: &Collaborators,
) -> Result<DeriveReport> {
    let resolution = member.check()?;
    let outputs = DerivedOutputs::for_member(&config.output_dir, &member.stem);
    let manifest_path = config
        .output_dir
        .join("manifests")
        .join(format!("{}_derive.json", member.stem));

    if !config.overwrite && outputs.all_exist() {
        info!(member = %member.identity(), "all derived files exist, skipping");
        let summary = finish_run(&manifest_path, "derive", &member.identity(), 1, Vec::new())?;
        return Ok(DeriveReport {
            outputs,
            written: false,
            summary,
        });
    }

    let index_box = collaborators.lookup.index_box(resolution, &member.region)?;
    let mask = collaborators.lookup.mask(resolution, &member.region)?;
    let scratch = ScratchSpace::create(&config.scratch_dir, &member.identity())?;
    let ctx = ChunkContext {
        index_box,
        mask,
        scratch: &scratch,
    };

    let mut tasks = Vec::with_capacity(member.ua100m.len() + member.tas.len());
    for (index, (ua100m, va100m)) in member.ua100m.iter().zip(&member.va100m).enumerate() {
        tasks.push(ChunkTask::Wind {
            index,
            ua100m: ua100m.clone(),
            va100m: va100m.clone(),
        });
    }
    for (index, (tas, rsds)) in member.tas.iter().zip(&member.rsds).enumerate() {
        tasks.push(ChunkTask::Pv {
            index,
            tas: tas.clone(),
            rsds: rsds.clone(),
        });
    }
    info!(
        member = %member.identity(),
        %resolution,
        chunks = tasks.len(),
        "deriving member"
    );

    let mut records = Vec::with_capacity(tasks.len());
    let mut chunks: BTreeMap<ChunkKey, ChunkFiles> = BTreeMap::new();
    let pool = WorkerPool::new(config.workers)?;
    debug!(workers = pool.workers(), "derive pool ready");
    pool.run(
        tasks,
        |task| execute_chunk(task, &ctx),
        |outcome| {
            match outcome.result {
                Ok(files) => {
                    records.push(TaskRecord::ok(outcome.key.to_string(), Vec::new()));
                    chunks.insert(outcome.key, files);
                }
                Err(err) => records.push(TaskRecord::failed(outcome.key.to_string(), &err)),
            }
            Ok(())
        },
    )?;

    let complete = records.iter().all(|r| r.is_ok());
    if complete {
        fan_in(&chunks, &outputs, config.low_output)?;
    } else {
        warn!(member = %member.identity(), "chunks failed, no derived file written");
    }
    let summary = finish_run(&manifest_path, "derive", &member.identity(), 0, records)?;
    Ok(DeriveReport {
        outputs,
        written: complete,
        summary,
    })
}

fn execute_chunk(task: &ChunkTask, ctx: &ChunkContext<'_>) -> Result<ChunkFiles> {
    match task {
        ChunkTask::Wind {
            index,
            ua100m,
            va100m,
        } => {
            let u = ctx.read_region(ua100m, "ua100m")?;
            let v = ctx.read_region(va100m, "va100m")?;
            let products = wind_products(&u, &v)?;
            let wind = ctx.scratch.file(&format!("wind_{index:03}.csv"));
            write_grid(&products.wind, &wind)?;
            let mut cf_wind = BTreeMap::new();
            for (turbine, cf) in &products.cf_wind {
                let path = ctx.scratch.file(&format!("cf_wind_{turbine}_{index:03}.csv"));
                write_grid(cf, &path)?;
                cf_wind.insert(*turbine, path);
            }
            Ok(ChunkFiles::Wind { wind, cf_wind })
        }
        ChunkTask::Pv { index, tas, rsds } => {
            let tas = ctx.read_region(tas, "tas")?;
            let rsds = ctx.read_region(rsds, "rsds")?;
            let cf = capacity_factor_grid(&tas, &rsds)?;
            let cf_pv = ctx.scratch.file(&format!("pv_{index:03}.csv"));
            write_grid(&cf, &cf_pv)?;
            Ok(ChunkFiles::Pv { cf_pv })
        }
    }
}

/// Concatenate chunk files of one kind in index order.
fn concat_files<'a>(
    paths: impl Iterator<Item = &'a PathBuf>,
    variable: &str,
) -> Result<GridDataset> {
    let parts = paths
        .map(|p| read_grid(p, variable))
        .collect::<Result<Vec<_>>>()?;
    Ok(concat_time(&parts)?)
}

fn fan_in(
    chunks: &BTreeMap<ChunkKey, ChunkFiles>,
    outputs: &DerivedOutputs,
    low_output: f64,
) -> Result<()> {
    // BTreeMap order is (side, index), so each side comes out sorted by index
    let mut wind_parts = Vec::new();
    let mut cf_parts: BTreeMap<Turbine, Vec<&PathBuf>> = BTreeMap::new();
    let mut pv_parts = Vec::new();
    for files in chunks.values() {
        match files {
            ChunkFiles::Wind { wind, cf_wind } => {
                wind_parts.push(wind);
                for (turbine, path) in cf_wind {
                    cf_parts.entry(*turbine).or_default().push(path);
                }
            }
            ChunkFiles::Pv { cf_pv } => pv_parts.push(cf_pv),
        }
    }

    let wind = concat_files(wind_parts.into_iter(), "sfcWind")?;
    write_grid(&wind, &outputs.wind)?;

    let mut cf_wind = BTreeMap::new();
    for (turbine, parts) in cf_parts {
        let cf = concat_files(parts.into_iter(), "CF_Wind")?;
        if let Some(path) = outputs.cf_wind.get(&turbine) {
            write_grid(&cf, path)?;
        }
        cf_wind.insert(turbine, cf);
    }

    let cf_pv = concat_files(pv_parts.into_iter(), "CF_PV")?;
    write_grid(&cf_pv, &outputs.cf_pv)?;

    for (turbine, compound) in compound_low_output(&cf_wind, &cf_pv, low_output)? {
        if let Some(path) = outputs.dunkelflaute.get(&turbine) {
            write_grid(&compound, path)?;
        }
    }
    info!(wind = %outputs.wind.display(), "derived files written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(ua: usize, va: usize, tas: usize, rsds: usize) -> MemberInputs {
        let files = |var: &str, n: usize| {
            (0..n)
                .map(|i| PathBuf::from(format!("/raw/CEU-3/{var}/{var}_{i}.csv")))
                .collect()
        };
        MemberInputs {
            region: "Germany".into(),
            stem: "CEU-3_MPI_historical".into(),
            ua100m: files("ua100m", ua),
            va100m: files("va100m", va),
            tas: files("tas", tas),
            rsds: files("rsds", rsds),
        }
    }

    #[test]
    fn mismatched_pairs_are_fatal() {
        assert!(member(3, 2, 1, 1).check().unwrap_err().is_fatal());
        assert!(member(1, 1, 2, 3).check().unwrap_err().is_fatal());
        assert!(member(0, 0, 0, 0).check().unwrap_err().is_fatal());
        assert_eq!(member(2, 2, 2, 2).check().unwrap(), Resolution::Ceu3);
    }

    #[test]
    fn one_sided_member_is_fatal() {
        assert!(member(2, 2, 0, 0).check().unwrap_err().is_fatal());
        assert!(member(0, 0, 2, 2).check().unwrap_err().is_fatal());
    }

    #[test]
    fn output_layout() {
        let outputs = DerivedOutputs::for_member(Path::new("/out"), "stem");
        assert_eq!(outputs.wind, Path::new("/out/Wind/stem_wind.csv"));
        assert_eq!(
            outputs.cf_wind[&Turbine::Turbine5MW],
            Path::new("/out/CF_Wind/5MW/stem_CF_Wind.csv")
        );
        assert_eq!(outputs.cf_pv, Path::new("/out/CF_PV/stem_CF_PV.csv"));
        assert_eq!(
            outputs.dunkelflaute[&Turbine::Turbine3_3MW],
            Path::new("/out/Dunkelflaute/3_3MW/stem_Dunkelflaute.csv")
        );
        assert_eq!(outputs.paths().count(), 6);
    }
}

//! `flaute.toml`: paths, run settings, histogram, external tool and
//! thresholds. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! [paths]
//! data_root = "/work/climate/regions"
//! output_dir = "/work/climate/statistics"
//!
//! [run]
//! regions = ["Germany", "ISAP"]
//! processes = 0
//!
//! ```
//!
//! Tool products are opt-in; with none configured a statistics run never
//! invokes the external tool. The usual set:
//!
//! ```toml
//! [tool]
//! program = "cdo"
//! products = [
//!     { name = "timmean", args = ["-s", "-timmean", "{input}", "{output}"] },
//!     { name = "fldmean", args = ["-s", "-fldmean", "{input}", "{output}"] },
//!     { name = "lt02", args = ["-s", "ltc,0.2", "{input}", "{output}"] },
//! ]
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use flaute_algo::{BinSpec, RegimeThresholds, LOW_OUTPUT_THRESHOLD};
use flaute_batch::{ProductSpec, ToolSettings};
use flaute_core::FlauteError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "flaute.toml";

/// Cluster schedulers export the CPU allocation here.
pub const SLURM_CPUS_VAR: &str = "SLURM_CPUS_PER_TASK";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlauteConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// JSON `file_name -> scenario -> {start, end}`.
    #[serde(default = "default_time_windows")]
    pub time_windows: PathBuf,
    /// JSON index boxes and mask files per resolution.
    #[serde(default = "default_lookup")]
    pub lookup: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
    /// 0 means "ask the scheduler, then use every CPU".
    #[serde(default)]
    pub processes: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    #[serde(default = "default_hist_min")]
    pub min: f64,
    #[serde(default = "default_hist_max")]
    pub max: f64,
    #[serde(default = "default_hist_bins")]
    pub bins: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default)]
    pub products: Vec<ProductSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_low_output")]
    pub low_output: f64,
    #[serde(default = "default_cut_in")]
    pub cut_in: f64,
    #[serde(default = "default_cut_out")]
    pub cut_out: f64,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("scratch")
}

fn default_time_windows() -> PathBuf {
    PathBuf::from("time_windows.json")
}

fn default_lookup() -> PathBuf {
    PathBuf::from("lookup.json")
}

fn default_regions() -> Vec<String> {
    [
        "Duisburg",
        "Germany",
        "IAWAK-EE",
        "ISAP",
        "KARE",
        "KlimaKonform",
        "WAKOS",
    ]
    .iter()
    .map(|r| r.to_string())
    .collect()
}

fn default_batch_size() -> usize {
    8
}

fn default_hist_min() -> f64 {
    0.0
}

fn default_hist_max() -> f64 {
    30.0
}

fn default_hist_bins() -> usize {
    100
}

fn default_program() -> String {
    "cdo".to_string()
}

fn default_timeout_minutes() -> u64 {
    60
}

fn default_low_output() -> f64 {
    LOW_OUTPUT_THRESHOLD
}

fn default_cut_in() -> f64 {
    RegimeThresholds::default().cut_in
}

fn default_cut_out() -> f64 {
    RegimeThresholds::default().cut_out
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            output_dir: default_output_dir(),
            scratch_dir: default_scratch_dir(),
            time_windows: default_time_windows(),
            lookup: default_lookup(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            processes: 0,
            batch_size: default_batch_size(),
            overwrite: false,
        }
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            min: default_hist_min(),
            max: default_hist_max(),
            bins: default_hist_bins(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_minutes: default_timeout_minutes(),
            products: Vec::new(),
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            low_output: default_low_output(),
            cut_in: default_cut_in(),
            cut_out: default_cut_out(),
        }
    }
}

impl FlauteConfig {
    /// Load `path`, or `./flaute.toml` when no path is given and it exists,
    /// or the defaults. Relative paths in the file are resolved against the
    /// file's directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    return Ok(FlauteConfig::default());
                }
                local
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("parsing config '{}'", path.display()))?;
        if let Some(base) = path.parent() {
            config.paths.resolve_against(base);
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: FlauteConfig =
            toml::from_str(text).map_err(|err| FlauteError::Config(err.to_string()))?;
        config.bin_spec()?;
        Ok(config)
    }

    pub fn bin_spec(&self) -> Result<BinSpec> {
        let HistogramConfig { min, max, bins } = self.histogram;
        Ok(BinSpec::new(min, max, bins)?)
    }

    pub fn regime(&self) -> RegimeThresholds {
        RegimeThresholds {
            cut_in: self.thresholds.cut_in,
            cut_out: self.thresholds.cut_out,
        }
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            program: self.tool.program.clone(),
            timeout: Duration::from_secs(self.tool.timeout_minutes * 60),
            products: self.tool.products.clone(),
        }
    }

    /// Worker count: the flag, then the file, then the scheduler allocation.
    /// 0 lets the pool use every CPU.
    pub fn processes(&self, flag: Option<usize>) -> usize {
        resolve_processes(flag, self.run.processes, env::var(SLURM_CPUS_VAR).ok())
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.data_root,
            &mut self.output_dir,
            &mut self.scratch_dir,
            &mut self.time_windows,
            &mut self.lookup,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

pub fn resolve_processes(flag: Option<usize>, configured: usize, scheduler: Option<String>) -> usize {
    if let Some(n) = flag {
        return n;
    }
    if configured > 0 {
        return configured;
    }
    scheduler
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

//! Grid files in tabular long format.
//!
//! One row per cell per time step:
//!
//! ```text
//! time,y,x,<variable>
//! 946684800,0,0,4.25
//! 946684800,0,1,
//! ```
//!
//! `time` is Unix seconds (UTC), `y`/`x` are 0-based grid indices, and an
//! empty value is a missing cell. Reading rebuilds the dense cube.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use flaute_core::{FlauteError, GridDataset};
use ndarray::{Array2, Array3};
use polars::prelude::*;
use tracing::debug;
#[cfg(feature = "parquet")]
use polars::prelude::{ParquetReader, ParquetWriter};

use crate::staging::{commit_staged, staged_path};

pub const TIME_COLUMN: &str = "time";
pub const Y_COLUMN: &str = "y";
pub const X_COLUMN: &str = "x";
pub const MASK_VARIABLE: &str = "MASK";

/// Read `variable` from a grid file into a dense cube.
pub fn read_grid(path: &Path, variable: &str) -> Result<GridDataset> {
    let df = read_frame(path)?;
    debug!(path = %path.display(), rows = df.height(), variable, "read grid frame");
    frame_to_grid(&df, variable).with_context(|| format!("decoding grid {}", path.display()))
}

/// Write a dataset, staging to a sibling file and renaming into place so a
/// killed writer never leaves a truncated output behind.
pub fn write_grid(dataset: &GridDataset, path: &Path) -> Result<()> {
    let mut df = grid_to_frame(dataset)?;
    let staged = staged_path(path);
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut file =
        File::create(&staged).with_context(|| format!("creating {}", staged.display()))?;
    match extension_of(path).as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetWriter::new(&mut file)
            .finish(&mut df)
            .map(|_| ())
            .context("writing Parquet file")?,
        #[cfg(not(feature = "parquet"))]
        "parquet" => bail!("parquet support is disabled; rebuild with the 'parquet' feature"),
        "csv" => CsvWriter::new(&mut file)
            .finish(&mut df)
            .context("writing CSV file")?,
        other => bail!(
            "unsupported output extension '{}' for {}; use .csv or .parquet",
            other,
            path.display()
        ),
    }
    drop(file);
    commit_staged(&staged, path)
}

/// Boolean mask on a grid: the first time step of the `MASK` variable,
/// with cells equal to 1 kept.
pub fn read_mask(path: &Path) -> Result<Array2<bool>> {
    let grid = read_grid(path, MASK_VARIABLE)?;
    if grid.is_empty() {
        bail!("mask {} has no time step", path.display());
    }
    let first = grid.values.index_axis(ndarray::Axis(0), 0);
    Ok(first.mapv(|v| v == 1.0))
}

fn read_frame(path: &Path) -> Result<DataFrame> {
    let extension = extension_of(path);
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => {
            let reader = ParquetReader::new(&mut file);
            reader.finish().context("reading Parquet file")
        }
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        "csv" => {
            let reader = CsvReader::new(&mut file);
            reader
                .has_header(true)
                .infer_schema(None)
                .finish()
                .context("reading CSV file")
        }
        _ => Err(anyhow!(
            "unsupported file extension '{}'; use .csv or .parquet",
            extension
        )),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

fn frame_to_grid(df: &DataFrame, variable: &str) -> Result<GridDataset> {
    let times = df
        .column(TIME_COLUMN)?
        .cast(&DataType::Int64)
        .context("casting time column to Int64")?;
    let ys = df
        .column(Y_COLUMN)?
        .cast(&DataType::Int64)
        .context("casting y column to Int64")?;
    let xs = df
        .column(X_COLUMN)?
        .cast(&DataType::Int64)
        .context("casting x column to Int64")?;
    let values = df
        .column(variable)
        .map_err(|_| FlauteError::Parse(format!("grid has no '{variable}' column")))?
        .cast(&DataType::Float64)
        .context("casting value column to Float64")?;

    let times = times.i64()?;
    let ys = ys.i64()?;
    let xs = xs.i64()?;
    let values = values.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    let mut time_index: BTreeMap<i64, usize> = BTreeMap::new();
    let (mut ny, mut nx) = (0usize, 0usize);
    for (((t, y), x), v) in times
        .into_iter()
        .zip(ys.into_iter())
        .zip(xs.into_iter())
        .zip(values.into_iter())
    {
        let (t, y, x) = match (t, y, x) {
            (Some(t), Some(y), Some(x)) if y >= 0 && x >= 0 => (t, y as usize, x as usize),
            _ => bail!("grid rows need non-negative time, y and x"),
        };
        time_index.entry(t).or_insert(0);
        ny = ny.max(y + 1);
        nx = nx.max(x + 1);
        rows.push((t, y, x, v.unwrap_or(f64::NAN)));
    }

    let mut stamps = Vec::with_capacity(time_index.len());
    for (idx, (secs, slot)) in time_index.iter_mut().enumerate() {
        *slot = idx;
        stamps.push(from_unix(*secs)?);
    }

    let mut cube = Array3::from_elem((stamps.len(), ny, nx), f64::NAN);
    for (t, y, x, v) in rows {
        cube[[time_index[&t], y, x]] = v;
    }
    Ok(GridDataset::new(variable, stamps, cube)?)
}

fn grid_to_frame(dataset: &GridDataset) -> Result<DataFrame> {
    let cells = dataset.len_time() * dataset.ny() * dataset.nx();
    let mut times = Vec::with_capacity(cells);
    let mut ys = Vec::with_capacity(cells);
    let mut xs = Vec::with_capacity(cells);
    let mut values: Vec<Option<f64>> = Vec::with_capacity(cells);
    for ((t, y, x), v) in dataset.values.indexed_iter() {
        times.push(to_unix(&dataset.times[t]));
        ys.push(y as i64);
        xs.push(x as i64);
        values.push(if v.is_nan() { None } else { Some(*v) });
    }
    let df = DataFrame::new(vec![
        Series::new(TIME_COLUMN, times),
        Series::new(Y_COLUMN, ys),
        Series::new(X_COLUMN, xs),
        Series::new(dataset.variable.as_str(), values),
    ])?;
    Ok(df)
}

pub fn to_unix(time: &NaiveDateTime) -> i64 {
    time.and_utc().timestamp()
}

pub fn from_unix(secs: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| anyhow!("timestamp {secs} out of range"))
}

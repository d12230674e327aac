#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use flaute_batch::{Collaborators, ExternalTool, ToolCommand, ToolOutcome};
use flaute_core::{GridDataset, IndexBox, Resolution};
use flaute_io::{write_grid, Mask, RegionLookup};
use ndarray::{Array2, Array3};

pub const WIND_FILE: &str = "sfcWind_EUR-11_MPI_historical_r1i1p1_1hr.csv";

/// Twice-daily timestamps covering every day of `year`.
pub fn twice_daily(year: i32) -> Vec<NaiveDateTime> {
    let mut t = NaiveDate::from_ymd_opt(year, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut times = Vec::new();
    while t < end {
        times.push(t);
        t += ChronoDuration::hours(12);
    }
    times
}

/// A 2x2 grid of `variable` whose value depends on the step index.
pub fn ramp_grid(variable: &str, times: Vec<NaiveDateTime>, f: impl Fn(usize) -> f64) -> GridDataset {
    let n = times.len();
    let values = Array3::from_shape_fn((n, 2, 2), |(t, _, _)| f(t));
    GridDataset::new(variable, times, values).unwrap()
}

pub fn write_fixture(path: &Path, dataset: &GridDataset) {
    write_grid(dataset, path).unwrap();
}

/// Full 2x2 grid, every cell kept.
pub struct WholeGrid;

impl RegionLookup for WholeGrid {
    fn index_box(&self, _resolution: Resolution, _region: &str) -> Result<IndexBox> {
        Ok(IndexBox::new(0, 1, 0, 1)?)
    }

    fn mask(&self, _resolution: Resolution, _region: &str) -> Result<Mask> {
        Ok(Arc::new(Array2::from_elem((2, 2), true)))
    }
}

/// Writes its last argument as the output file, optionally timing out on
/// the first `timeouts` calls.
pub struct FakeTool {
    pub calls: AtomicUsize,
    pub timeouts: usize,
}

impl FakeTool {
    pub fn new(timeouts: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            timeouts,
        }
    }
}

impl ExternalTool for FakeTool {
    fn run(&self, command: &ToolCommand, _timeout: Duration) -> Result<ToolOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.timeouts {
            return Ok(ToolOutcome::TimedOut);
        }
        let output = command.args.last().expect("output argument");
        std::fs::write(output, command.to_string())?;
        Ok(ToolOutcome::Completed {
            success: true,
            code: Some(0),
        })
    }
}

pub fn collaborators(tool: Arc<FakeTool>) -> Collaborators {
    Collaborators {
        lookup: Arc::new(WholeGrid),
        tool,
    }
}

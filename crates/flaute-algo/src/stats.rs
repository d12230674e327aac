//! Statistical aggregation of one data slice.
//!
//! Every statistic ignores missing (NaN) samples. A slice with no valid
//! sample is an error, never a row of zeros or NaNs.
//!
//! Conventions follow the usual array-library definitions:
//! - percentiles interpolate linearly between order statistics at rank
//!   `p / 100 * (n - 1)`
//! - the standard deviation is the population deviation around the mean
//!   already computed for the slice
//! - histogram bins are half-open `[e_i, e_{i+1})` except the last, which is
//!   closed; samples outside `[min, max]` are not counted

use flaute_core::{FlauteError, FlauteResult, GridDataset};
use flaute_ts::hourly_means;
use serde::{Deserialize, Serialize};

/// Linear histogram bins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_bins")]
    pub bins: usize,
}

fn default_min() -> f64 {
    0.0
}

fn default_max() -> f64 {
    30.0
}

fn default_bins() -> usize {
    100
}

impl Default for BinSpec {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            bins: default_bins(),
        }
    }
}

impl BinSpec {
    pub fn new(min: f64, max: f64, bins: usize) -> FlauteResult<Self> {
        if bins == 0 || !(max > min) {
            return Err(FlauteError::Config(format!(
                "invalid histogram bins: {bins} over [{min}, {max}]"
            )));
        }
        Ok(Self { min, max, bins })
    }

    /// `bins + 1` evenly spaced edges; the last edge is exactly `max`.
    pub fn edges(&self) -> Vec<f64> {
        let step = (self.max - self.min) / self.bins as f64;
        let mut edges: Vec<f64> = (0..=self.bins)
            .map(|i| self.min + i as f64 * step)
            .collect();
        if let Some(last) = edges.last_mut() {
            *last = self.max;
        }
        edges
    }

    /// Edges as recorded in result files, rounded to one decimal.
    pub fn stored_edges(&self) -> Vec<f64> {
        self.edges()
            .into_iter()
            .map(|e| (e * 10.0).round() / 10.0)
            .collect()
    }

    /// Count `values` per bin.
    pub fn histogram(&self, values: &[f64]) -> Vec<u64> {
        let edges = self.edges();
        let mut counts = vec![0u64; self.bins];
        for &v in values {
            if v.is_nan() || v < self.min || v > self.max {
                continue;
            }
            let idx = edges.partition_point(|&e| e <= v).saturating_sub(1);
            counts[idx.min(self.bins - 1)] += 1;
        }
        counts
    }
}

/// Wind-speed thresholds of the operating-regime breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    pub cut_in: f64,
    pub cut_out: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            cut_in: 3.0,
            cut_out: 25.0,
        }
    }
}

/// Fractions of valid samples per turbine operating regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingRegime {
    pub under_cut_in: f64,
    pub above_cut_out: f64,
    pub nominal: f64,
}

impl OperatingRegime {
    pub fn of(values: &[f64], thresholds: &RegimeThresholds) -> FlauteResult<Self> {
        let valid = values.iter().filter(|v| !v.is_nan()).count();
        if valid == 0 {
            return Err(FlauteError::EmptySlice(
                "no valid samples for operating regime".into(),
            ));
        }
        let n = valid as f64;
        let below = values.iter().filter(|&&v| v < thresholds.cut_in).count() as f64 / n;
        let above = values.iter().filter(|&&v| v > thresholds.cut_out).count() as f64 / n;
        Ok(Self {
            under_cut_in: below,
            above_cut_out: above,
            nominal: 1.0 - below - above,
        })
    }
}

/// What to compute for a slice besides the always-on statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateOptions {
    pub bins: BinSpec,
    /// Set for wind speed to add the operating-regime fractions.
    pub regime: Option<RegimeThresholds>,
}

/// Statistics of one (slice, variable) pair, keyed as in result files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceStats {
    pub mean: f64,
    pub std: f64,
    #[serde(rename = "10th_percentile")]
    pub p10: f64,
    #[serde(rename = "90th_percentile")]
    pub p90: f64,
    #[serde(rename = "95th_percentile")]
    pub p95: f64,
    pub counts: Vec<u64>,
    /// Mean of the spatial mean per hour of day; `None` for hours without
    /// samples.
    pub diurnal_cycle: Vec<Option<f64>>,
    #[serde(flatten)]
    pub regime: Option<OperatingRegime>,
}

/// Percentile `p` (0-100) of ascending-sorted, NaN-free `sorted`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile `p` of `values`, ignoring NaN.
pub fn nan_percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Population standard deviation around a given `mean`, ignoring NaN.
pub fn nan_std_with_mean(values: &[f64], mean: f64) -> Option<f64> {
    let (ss, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + (v - mean).powi(2), n + 1));
    (n > 0).then(|| (ss / n as f64).sqrt())
}

/// Compute [`SliceStats`] for one slice.
pub fn aggregate(slice: &GridDataset, options: &AggregateOptions) -> FlauteResult<SliceStats> {
    let mut values = slice.valid_values();
    if values.is_empty() {
        return Err(FlauteError::EmptySlice(format!(
            "{} has no valid samples in {} time steps",
            slice.variable,
            slice.len_time()
        )));
    }
    values.sort_by(f64::total_cmp);

    let empty = || FlauteError::EmptySlice(slice.variable.clone());
    let mean = nan_mean(&values).ok_or_else(empty)?;
    let std = nan_std_with_mean(&values, mean).ok_or_else(empty)?;
    let p10 = percentile_sorted(&values, 10.0).ok_or_else(empty)?;
    let p90 = percentile_sorted(&values, 90.0).ok_or_else(empty)?;
    let p95 = percentile_sorted(&values, 95.0).ok_or_else(empty)?;
    let regime = options
        .regime
        .map(|thresholds| OperatingRegime::of(&values, &thresholds))
        .transpose()?;

    Ok(SliceStats {
        mean,
        std,
        p10,
        p90,
        p95,
        counts: options.bins.histogram(&values),
        diurnal_cycle: hourly_means(&slice.times, &slice.field_mean()),
        regime,
    })
}

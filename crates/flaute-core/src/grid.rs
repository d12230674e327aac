use chrono::NaiveDateTime;
use ndarray::{Array3, Axis, Zip};

use crate::error::{FlauteError, FlauteResult};

/// A gridded time series of one variable: a `(time, y, x)` cube with NaN as
/// the missing-value sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDataset {
    pub variable: String,
    pub times: Vec<NaiveDateTime>,
    pub values: Array3<f64>,
}

impl GridDataset {
    pub fn new(
        variable: impl Into<String>,
        times: Vec<NaiveDateTime>,
        values: Array3<f64>,
    ) -> FlauteResult<Self> {
        if times.len() != values.len_of(Axis(0)) {
            return Err(FlauteError::Parse(format!(
                "{} timestamps for a cube with {} time steps",
                times.len(),
                values.len_of(Axis(0))
            )));
        }
        Ok(Self {
            variable: variable.into(),
            times,
            values,
        })
    }

    /// Cube of `fill` with the given timestamps and grid shape.
    pub fn filled(
        variable: impl Into<String>,
        times: Vec<NaiveDateTime>,
        ny: usize,
        nx: usize,
        fill: f64,
    ) -> Self {
        let nt = times.len();
        Self {
            variable: variable.into(),
            times,
            values: Array3::from_elem((nt, ny, nx), fill),
        }
    }

    pub fn len_time(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn ny(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn nx(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    /// Keep only the given time steps, in the given order.
    pub fn select_times(&self, indices: &[usize]) -> GridDataset {
        GridDataset {
            variable: self.variable.clone(),
            times: indices.iter().map(|&i| self.times[i]).collect(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Cell-wise transform into a new variable.
    pub fn map(&self, variable: impl Into<String>, f: impl Fn(f64) -> f64) -> GridDataset {
        GridDataset {
            variable: variable.into(),
            times: self.times.clone(),
            values: self.values.mapv(f),
        }
    }

    /// Cell-wise combination of two datasets on the same grid and time axis.
    pub fn zip_map(
        &self,
        other: &GridDataset,
        variable: impl Into<String>,
        f: impl Fn(f64, f64) -> f64,
    ) -> FlauteResult<GridDataset> {
        self.ensure_aligned(other)?;
        let mut out = Array3::<f64>::zeros(self.values.raw_dim());
        Zip::from(&mut out)
            .and(&self.values)
            .and(&other.values)
            .for_each(|o, &a, &b| *o = f(a, b));
        Ok(GridDataset {
            variable: variable.into(),
            times: self.times.clone(),
            values: out,
        })
    }

    /// Fail unless `other` shares this dataset's shape and timestamps.
    pub fn ensure_aligned(&self, other: &GridDataset) -> FlauteResult<()> {
        if self.values.shape() != other.values.shape() {
            return Err(FlauteError::Precondition(format!(
                "{} has shape {:?} but {} has shape {:?}",
                self.variable,
                self.values.shape(),
                other.variable,
                other.values.shape()
            )));
        }
        if self.times != other.times {
            return Err(FlauteError::Precondition(format!(
                "{} and {} have different time axes",
                self.variable, other.variable
            )));
        }
        Ok(())
    }

    /// All non-missing values, flattened.
    pub fn valid_values(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| !v.is_nan()).collect()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Spatial mean per time step, ignoring missing cells. A time step with
    /// no valid cell yields NaN.
    pub fn field_mean(&self) -> Vec<f64> {
        self.values
            .axis_iter(Axis(0))
            .map(|field| {
                let (sum, count) = field
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            })
            .collect()
    }
}

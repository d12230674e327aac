use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FlauteError, FlauteResult};

/// Spatial resolution of a model domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// 0.11° EURO-CORDEX domain
    #[serde(rename = "EUR-11")]
    Eur11,
    /// 3 km convection-permitting central-Europe domain
    #[serde(rename = "CEU-3")]
    Ceu3,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Eur11 => "EUR-11",
            Resolution::Ceu3 => "CEU-3",
        }
    }

    /// Detect the resolution tag embedded in a path or file name.
    pub fn detect(path: &str) -> FlauteResult<Resolution> {
        if path.contains("EUR-11") {
            Ok(Resolution::Eur11)
        } else if path.contains("CEU-3") {
            Ok(Resolution::Ceu3)
        } else {
            Err(FlauteError::Precondition(format!(
                "cannot determine resolution of '{path}'"
            )))
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = FlauteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::detect(s)
    }
}

/// One physical gridded file in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetReference {
    pub region: String,
    pub variable: String,
    pub scenario: String,
    pub resolution: Resolution,
    pub path: PathBuf,
}

impl DatasetReference {
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// Inclusive range of calendar years analysed for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(rename = "start")]
    pub start_year: i32,
    #[serde(rename = "end")]
    pub end_year: i32,
}

impl TimeWindow {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
        }
    }

    /// `start-01-01T00:00:00`
    pub fn start(&self) -> FlauteResult<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.start_year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| FlauteError::Parse(format!("invalid start year {}", self.start_year)))
    }

    /// `end-12-31T23:59:59`, so every sample on the last day is included.
    pub fn end(&self) -> FlauteResult<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.end_year, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or_else(|| FlauteError::Parse(format!("invalid end year {}", self.end_year)))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-01-01..{}-12-31", self.start_year, self.end_year)
    }
}

/// Rectangular grid-index window, 0-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBox {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl IndexBox {
    pub fn new(x0: usize, x1: usize, y0: usize, y1: usize) -> FlauteResult<Self> {
        if x1 < x0 || y1 < y0 {
            return Err(FlauteError::Precondition(format!(
                "index box {x0},{x1},{y0},{y1} has inverted bounds"
            )));
        }
        Ok(Self { x0, x1, y0, y1 })
    }

    pub fn width(&self) -> usize {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0 + 1
    }

    /// `selindexbox` argument for the external tool, which counts from 1.
    pub fn to_tool_arg(&self) -> String {
        format!(
            "{},{},{},{}",
            self.x0 + 1,
            self.x1 + 1,
            self.y0 + 1,
            self.y1 + 1
        )
    }
}

/// File name of a path as an owned string.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

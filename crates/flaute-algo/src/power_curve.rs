//! Turbine power curves.
//!
//! Each curve is a table of (wind speed, electrical power) breakpoints
//! between cut-in and rated speed. Capacity factor is the linearly
//! interpolated power divided by the rated power, with:
//!
//! - `ws < cut-in` → 0
//! - `last breakpoint < ws <= 25 m/s` → 1 (rated output)
//! - `ws > 25 m/s` → 0 (storm shutdown)
//! - `NaN` → `NaN`

use std::fmt;
use std::str::FromStr;

use flaute_core::{FlauteError, GridDataset};
use serde::{Deserialize, Serialize};

/// Wind speed above which turbines shut down (m/s).
pub const CUT_OUT_SPEED: f64 = 25.0;

const SPEEDS_3_3MW: [f64; 32] = [
    3.25, 3.5, 3.75, 4.0, 4.25, 4.5, 4.75, 5.0, 5.25, 5.5, 5.75, 6.0, 6.25, 6.5, 6.75, 7.0, 7.25,
    7.5, 7.75, 8.0, 8.25, 8.5, 8.75, 9.0, 9.25, 9.5, 9.75, 10.0, 10.25, 10.5, 10.75, 11.0,
];

const POWER_3_3MW: [f64; 32] = [
    138.0, 173.0, 223.0, 286.0, 358.0, 440.0, 529.0, 623.0, 722.0, 827.0, 941.0, 1069.0, 1211.0,
    1367.0, 1535.0, 1715.0, 1903.0, 2096.0, 2290.0, 2482.0, 2666.0, 2835.0, 2979.0, 3088.0,
    3159.0, 3198.0, 3219.0, 3232.0, 3247.0, 3265.0, 3282.0, 3294.0,
];

const SPEEDS_5MW: [f64; 30] = [
    4.0, 4.25, 4.5, 4.75, 5.0, 5.25, 5.5, 5.75, 6.0, 6.25, 6.5, 6.75, 7.0, 7.25, 7.5, 7.75, 8.0,
    8.25, 8.5, 8.75, 9.0, 9.25, 9.5, 9.75, 10.0, 10.25, 10.5, 10.75, 11.0, 11.25,
];

const POWER_5MW: [f64; 30] = [
    224.0, 269.0, 319.0, 376.0, 438.0, 507.0, 583.0, 666.0, 757.0, 856.0, 963.0, 1078.0, 1202.0,
    1336.0, 1479.0, 1632.0, 1795.0, 1969.0, 2153.0, 2349.0, 2556.0, 2775.0, 3006.0, 3249.0,
    3506.0, 3775.0, 4058.0, 4355.0, 4666.0, 4992.0,
];

/// Supported turbine classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Turbine {
    /// 3.3 MW onshore class
    #[serde(rename = "3_3MW")]
    Turbine3_3MW,
    /// 5 MW class
    #[serde(rename = "5MW")]
    Turbine5MW,
}

impl Turbine {
    pub const ALL: [Turbine; 2] = [Turbine::Turbine3_3MW, Turbine::Turbine5MW];

    pub fn as_str(&self) -> &'static str {
        match self {
            Turbine::Turbine3_3MW => "3_3MW",
            Turbine::Turbine5MW => "5MW",
        }
    }

    pub fn rated_power_kw(&self) -> f64 {
        match self {
            Turbine::Turbine3_3MW => 3300.0,
            Turbine::Turbine5MW => 5000.0,
        }
    }

    fn table(&self) -> (&'static [f64], &'static [f64]) {
        match self {
            Turbine::Turbine3_3MW => (&SPEEDS_3_3MW, &POWER_3_3MW),
            Turbine::Turbine5MW => (&SPEEDS_5MW, &POWER_5MW),
        }
    }

    /// Capacity factor for one wind speed (m/s).
    pub fn capacity_factor(&self, wind_speed: f64) -> f64 {
        if wind_speed.is_nan() {
            return f64::NAN;
        }
        if wind_speed > CUT_OUT_SPEED {
            return 0.0;
        }
        let (speeds, power) = self.table();
        if wind_speed < speeds[0] {
            return 0.0;
        }
        if wind_speed > speeds[speeds.len() - 1] {
            return 1.0;
        }
        // first breakpoint strictly above ws; ws itself lies in [i-1, i)
        let upper = speeds.partition_point(|&s| s <= wind_speed);
        let kw = if upper >= speeds.len() {
            power[power.len() - 1]
        } else {
            let (s0, s1) = (speeds[upper - 1], speeds[upper]);
            let (p0, p1) = (power[upper - 1], power[upper]);
            p0 + (p1 - p0) * (wind_speed - s0) / (s1 - s0)
        };
        kw / self.rated_power_kw()
    }

    /// Map a wind-speed dataset to `CF_Wind`.
    pub fn apply(&self, wind_speed: &GridDataset) -> GridDataset {
        wind_speed.map("CF_Wind", |ws| self.capacity_factor(ws))
    }
}

impl fmt::Display for Turbine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Turbine {
    type Err = FlauteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "3_3MW" | "3.3MW" => Ok(Turbine::Turbine3_3MW),
            "5MW" => Ok(Turbine::Turbine5MW),
            other => Err(FlauteError::Config(format!("unknown turbine '{other}'"))),
        }
    }
}

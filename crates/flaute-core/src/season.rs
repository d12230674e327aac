use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::FlauteError;

/// Meteorological season of a time sample. `Year` is the unsplit series;
/// the other four partition the calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Year,
    #[serde(rename = "DJF")]
    Djf,
    #[serde(rename = "MAM")]
    Mam,
    #[serde(rename = "JJA")]
    Jja,
    #[serde(rename = "SON")]
    Son,
}

impl Season {
    /// All slices computed for one scenario, full year first.
    pub const ALL: [Season; 5] = [
        Season::Year,
        Season::Djf,
        Season::Mam,
        Season::Jja,
        Season::Son,
    ];

    /// The four disjoint seasonal partitions.
    pub const PARTITIONS: [Season; 4] = [Season::Djf, Season::Mam, Season::Jja, Season::Son];

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Year => "Year",
            Season::Djf => "DJF",
            Season::Mam => "MAM",
            Season::Jja => "JJA",
            Season::Son => "SON",
        }
    }

    /// Seasonal partition for a calendar month (1-12).
    pub fn of_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Djf,
            3..=5 => Season::Mam,
            6..=8 => Season::Jja,
            _ => Season::Son,
        }
    }

    pub fn of(time: &NaiveDateTime) -> Season {
        Season::of_month(time.month())
    }

    /// Whether a timestamp belongs to this slice. `Year` contains everything.
    pub fn contains(&self, time: &NaiveDateTime) -> bool {
        match self {
            Season::Year => true,
            season => Season::of(time) == *season,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = FlauteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YEAR" => Ok(Season::Year),
            "DJF" => Ok(Season::Djf),
            "MAM" => Ok(Season::Mam),
            "JJA" => Ok(Season::Jja),
            "SON" => Ok(Season::Son),
            other => Err(FlauteError::Parse(format!(
                "unknown season '{other}'; use Year, DJF, MAM, JJA or SON"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn months_map_to_meteorological_seasons() {
        let expected = [
            Season::Djf,
            Season::Djf,
            Season::Mam,
            Season::Mam,
            Season::Mam,
            Season::Jja,
            Season::Jja,
            Season::Jja,
            Season::Son,
            Season::Son,
            Season::Son,
            Season::Djf,
        ];
        for (idx, season) in expected.iter().enumerate() {
            assert_eq!(Season::of_month(idx as u32 + 1), *season);
        }
    }

    #[test]
    fn year_contains_everything() {
        let t = NaiveDate::from_ymd_opt(2001, 7, 4)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        assert!(Season::Year.contains(&t));
        assert!(Season::Jja.contains(&t));
        assert!(!Season::Djf.contains(&t));
    }

    #[test]
    fn parses_and_serializes_labels() {
        assert_eq!("djf".parse::<Season>().unwrap(), Season::Djf);
        assert_eq!("Year".parse::<Season>().unwrap(), Season::Year);
        assert!("winter".parse::<Season>().is_err());
        assert_eq!(serde_json::to_string(&Season::Son).unwrap(), "\"SON\"");
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use flaute_core::TimeWindow;
use serde::{Deserialize, Serialize};

use crate::staging::read_json;

/// `file_name → scenario → {start, end}` as persisted next to the archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeWindows {
    pub files: BTreeMap<String, BTreeMap<String, TimeWindow>>,
}

impl TimeWindows {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path).with_context(|| format!("loading time windows '{}'", path.display()))
    }

    pub fn insert(&mut self, file_name: impl Into<String>, scenario: impl Into<String>, window: TimeWindow) {
        self.files
            .entry(file_name.into())
            .or_default()
            .insert(scenario.into(), window);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, TimeWindow>)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_nested_windows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("time.json");
        fs::write(
            &path,
            r#"{"a_historical_b.nc": {"historical": {"start": 1971, "end": 2000}},
                "a_ssp370-GWL2K_b.nc": {"GWL2K": {"start": 2031, "end": 2060}}}"#,
        )
        .unwrap();
        let windows = TimeWindows::load(&path).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(
            windows.files["a_ssp370-GWL2K_b.nc"]["GWL2K"],
            TimeWindow::new(2031, 2060)
        );
        assert!(!windows.files["a_historical_b.nc"].contains_key("GWL2K"));
    }
}

//! Region index boxes and masks.
//!
//! Both are static tables per (resolution, region). The pipeline only sees
//! the [`RegionLookup`] trait; [`TableLookup`] backs it with a JSON document:
//!
//! ```json
//! {
//!   "index_boxes": { "CEU-3": { "Germany": [62, 270, 69, 353] } },
//!   "masks":       { "CEU-3": { "Germany": "masks/CEU-3_Germany.csv" } }
//! }
//! ```
//!
//! Mask paths are resolved relative to the lookup document.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use flaute_core::{FlauteError, IndexBox, Resolution};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::grid_file::read_mask;
use crate::staging::read_json;

pub type Mask = Arc<Array2<bool>>;

pub trait RegionLookup: Send + Sync {
    fn index_box(&self, resolution: Resolution, region: &str) -> Result<IndexBox>;
    fn mask(&self, resolution: Resolution, region: &str) -> Result<Mask>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupTables {
    #[serde(default)]
    pub index_boxes: BTreeMap<Resolution, BTreeMap<String, [usize; 4]>>,
    #[serde(default)]
    pub masks: BTreeMap<Resolution, BTreeMap<String, PathBuf>>,
}

/// JSON-backed lookup. Masks are read once and shared across tasks.
pub struct TableLookup {
    tables: LookupTables,
    base_dir: PathBuf,
    cache: RwLock<HashMap<(Resolution, String), Mask>>,
}

impl TableLookup {
    pub fn new(tables: LookupTables, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            tables,
            base_dir: base_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let tables: LookupTables = read_json(path)
            .with_context(|| format!("loading region lookup '{}'", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Ok(Self::new(tables, base_dir))
    }

    fn mask_path(&self, resolution: Resolution, region: &str) -> Result<PathBuf> {
        let relative = self
            .tables
            .masks
            .get(&resolution)
            .and_then(|regions| regions.get(region))
            .ok_or_else(|| {
                FlauteError::Precondition(format!("no mask for {region} at {resolution}"))
            })?;
        Ok(self.base_dir.join(relative))
    }
}

impl RegionLookup for TableLookup {
    fn index_box(&self, resolution: Resolution, region: &str) -> Result<IndexBox> {
        let [x0, x1, y0, y1] = self
            .tables
            .index_boxes
            .get(&resolution)
            .and_then(|regions| regions.get(region))
            .copied()
            .ok_or_else(|| {
                FlauteError::Precondition(format!("no index box for {region} at {resolution}"))
            })?;
        Ok(IndexBox::new(x0, x1, y0, y1)?)
    }

    fn mask(&self, resolution: Resolution, region: &str) -> Result<Mask> {
        let key = (resolution, region.to_string());
        if let Ok(cache) = self.cache.read() {
            if let Some(mask) = cache.get(&key) {
                return Ok(Arc::clone(mask));
            }
        }
        let path = self.mask_path(resolution, region)?;
        let mask = Arc::new(read_mask(&path)?);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, Arc::clone(&mask));
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_tables(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir.join("masks")).unwrap();
        fs::write(
            dir.join("masks").join("ceu3_duisburg.csv"),
            "time,y,x,MASK\n0,0,0,1\n0,0,1,0\n",
        )
        .unwrap();
        let path = dir.join("lookup.json");
        fs::write(
            &path,
            r#"{"index_boxes": {"CEU-3": {"Duisburg": [15, 26, 152, 163]}},
                "masks": {"CEU-3": {"Duisburg": "masks/ceu3_duisburg.csv"}}}"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn resolves_boxes_and_masks() {
        let dir = tempdir().unwrap();
        let lookup = TableLookup::load(&write_tables(dir.path())).unwrap();
        let bx = lookup.index_box(Resolution::Ceu3, "Duisburg").unwrap();
        assert_eq!(bx.to_tool_arg(), "16,27,153,164");
        let mask = lookup.mask(Resolution::Ceu3, "Duisburg").unwrap();
        assert_eq!(mask.shape(), &[1, 2]);
        assert!(mask[[0, 0]] && !mask[[0, 1]]);
        let again = lookup.mask(Resolution::Ceu3, "Duisburg").unwrap();
        assert!(Arc::ptr_eq(&mask, &again));
    }

    #[test]
    fn unknown_entries_are_preconditions() {
        let dir = tempdir().unwrap();
        let lookup = TableLookup::load(&write_tables(dir.path())).unwrap();
        let err = lookup.index_box(Resolution::Eur11, "Duisburg").unwrap_err();
        assert!(err
            .downcast_ref::<FlauteError>()
            .map(FlauteError::is_fatal)
            .unwrap_or(false));
    }
}

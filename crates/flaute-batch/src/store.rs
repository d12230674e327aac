//! Result store: `region → cleaned file → scenario → season → metrics`.
//!
//! One JSON document per region:
//!
//! ```json
//! {
//!   "edges": [0.0, 0.3, ...],
//!   "<cleaned>": { "<scenario>": { "DJF": { "mean": 5.2, ... } } }
//! }
//! ```
//!
//! Only the coordinator mutates the store. [`ResultStore::merge`] writes
//! strictly under its key, so results can be merged in any order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flaute_algo::SliceStats;
use flaute_core::{FlauteError, Season};
use flaute_io::{read_json, write_json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything recorded for one (region, file, scenario, season).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceResult {
    #[serde(flatten)]
    pub stats: SliceStats,
    /// Tool-produced files by product name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub products: BTreeMap<String, PathBuf>,
}

pub type SeasonResults = BTreeMap<Season, SliceResult>;
pub type ScenarioResults = BTreeMap<String, SeasonResults>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStore {
    pub edges: Vec<f64>,
    #[serde(flatten)]
    pub files: BTreeMap<String, ScenarioResults>,
}

impl RegionStore {
    pub fn new(edges: Vec<f64>) -> Self {
        Self {
            edges,
            files: BTreeMap::new(),
        }
    }
}

/// Full address of one slice in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub region: String,
    pub cleaned: String,
    pub scenario: String,
    pub season: Season,
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.region, self.cleaned, self.scenario, self.season
        )
    }
}

/// All region documents of one statistics variant, backed by a directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
    edges: Vec<f64>,
    regions: BTreeMap<String, RegionStore>,
    dirty: BTreeSet<String>,
}

impl ResultStore {
    /// Empty in-memory store that persists to `dir`.
    pub fn new(dir: impl Into<PathBuf>, edges: Vec<f64>) -> Self {
        Self {
            dir: dir.into(),
            edges,
            regions: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Load the documents of `regions` that exist under `dir`.
    ///
    /// A document recorded with different histogram edges is a precondition
    /// violation: its counts would not be comparable with new ones.
    pub fn load(dir: &Path, regions: &[String], edges: &[f64]) -> Result<Self> {
        let mut store = Self::new(dir, edges.to_vec());
        for region in regions {
            let path = store.region_path(region);
            if !path.exists() {
                continue;
            }
            let doc: RegionStore = read_json(&path)?;
            if !same_edges(&doc.edges, edges) {
                return Err(FlauteError::Precondition(format!(
                    "'{}' was written with {} histogram edges different from the configured {}",
                    path.display(),
                    doc.edges.len(),
                    edges.len()
                ))
                .into());
            }
            debug!(region = %region, files = doc.files.len(), "loaded result store");
            store.regions.insert(region.clone(), doc);
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn region_path(&self, region: &str) -> PathBuf {
        self.dir.join(format!("{region}.json"))
    }

    pub fn region(&self, region: &str) -> Option<&RegionStore> {
        self.regions.get(region)
    }

    /// Scenarios recorded for one dataset of a region.
    pub fn scenarios(&self, region: &str, cleaned: &str) -> BTreeSet<String> {
        self.regions
            .get(region)
            .and_then(|doc| doc.files.get(cleaned))
            .map(|scenarios| scenarios.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &StoreKey) -> Option<&SliceResult> {
        self.regions
            .get(&key.region)?
            .files
            .get(&key.cleaned)?
            .get(&key.scenario)?
            .get(&key.season)
    }

    pub fn contains(&self, key: &StoreKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert `result` under `key`, creating missing levels. Siblings of
    /// `key` are never touched; merging the same pair twice is a no-op.
    pub fn merge(&mut self, key: &StoreKey, result: SliceResult) {
        let edges = &self.edges;
        self.regions
            .entry(key.region.clone())
            .or_insert_with(|| RegionStore::new(edges.clone()))
            .files
            .entry(key.cleaned.clone())
            .or_default()
            .entry(key.scenario.clone())
            .or_default()
            .insert(key.season, result);
        self.dirty.insert(key.region.clone());
    }

    /// Number of regions with unsaved merges.
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Rewrite every region document changed since the last persist.
    pub fn persist(&mut self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for region in std::mem::take(&mut self.dirty) {
            let Some(doc) = self.regions.get(&region) else {
                continue;
            };
            let path = self.region_path(&region);
            write_json(&path, doc)
                .with_context(|| format!("persisting results for region {region}"))?;
            info!(path = %path.display(), "persisted result store");
            written.push(path);
        }
        Ok(written)
    }
}

fn same_edges(stored: &[f64], configured: &[f64]) -> bool {
    stored.len() == configured.len()
        && stored
            .iter()
            .zip(configured)
            .all(|(a, b)| (a - b).abs() < 1e-9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flaute_algo::BinSpec;

    fn stats(mean: f64) -> SliceResult {
        SliceResult {
            stats: SliceStats {
                mean,
                std: 1.0,
                p10: 0.0,
                p90: 2.0,
                p95: 3.0,
                counts: vec![1, 2],
                diurnal_cycle: vec![Some(mean); 24],
                regime: None,
            },
            products: BTreeMap::new(),
        }
    }

    fn key(scenario: &str, season: Season) -> StoreKey {
        StoreKey {
            region: "RegionA".into(),
            cleaned: "FileA".into(),
            scenario: scenario.into(),
            season,
        }
    }

    #[test]
    fn merge_leaves_sibling_scenarios_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let edges = BinSpec::default().stored_edges();
        let mut store = ResultStore::new(dir.path(), edges.clone());
        store.merge(&key("Scen2", Season::Djf), stats(2.0));
        store.persist().unwrap();
        let before = serde_json::to_vec(
            &store.region("RegionA").unwrap().files["FileA"]["Scen2"],
        )
        .unwrap();

        store.merge(&key("Scen1", Season::Djf), stats(1.0));
        store.persist().unwrap();

        let reloaded = ResultStore::load(dir.path(), &["RegionA".to_string()], &edges).unwrap();
        let after =
            serde_json::to_vec(&reloaded.region("RegionA").unwrap().files["FileA"]["Scen2"])
                .unwrap();
        assert_eq!(before, after);
        assert_eq!(reloaded.get(&key("Scen1", Season::Djf)), Some(&stats(1.0)));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut once = ResultStore::new("unused", vec![0.0, 1.0]);
        once.merge(&key("Scen1", Season::Year), stats(1.0));
        let mut twice = once.clone();
        twice.merge(&key("Scen1", Season::Year), stats(1.0));
        assert_eq!(once.regions, twice.regions);
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let results = [
            (key("Scen1", Season::Year), stats(1.0)),
            (key("Scen1", Season::Jja), stats(2.0)),
            (key("Scen2", Season::Year), stats(3.0)),
        ];
        let mut forward = ResultStore::new("unused", vec![0.0, 1.0]);
        for (k, r) in results.iter().cloned() {
            forward.merge(&k, r);
        }
        let mut backward = ResultStore::new("unused", vec![0.0, 1.0]);
        for (k, r) in results.iter().rev().cloned() {
            backward.merge(&k, r);
        }
        assert_eq!(forward.regions, backward.regions);
    }

    #[test]
    fn changed_edges_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ResultStore::new(dir.path(), vec![0.0, 1.0, 2.0]);
        store.merge(&key("Scen1", Season::Year), stats(1.0));
        store.persist().unwrap();

        let err = ResultStore::load(dir.path(), &["RegionA".to_string()], &[0.0, 2.0]).unwrap_err();
        assert_eq!(
            FlauteError::classify(&err),
            flaute_core::ErrorKind::Precondition
        );
    }

    #[test]
    fn document_layout_matches_region_files() {
        let mut store = ResultStore::new("unused", vec![0.0, 1.0]);
        store.merge(&key("historical", Season::Djf), stats(1.5));
        let json = serde_json::to_value(store.region("RegionA").unwrap()).unwrap();
        assert_eq!(json["edges"], serde_json::json!([0.0, 1.0]));
        assert_eq!(json["FileA"]["historical"]["DJF"]["mean"], 1.5);
        assert!(json["FileA"]["historical"]["DJF"].get("products").is_none());
    }

    #[test]
    fn persist_only_rewrites_dirty_regions() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ResultStore::new(dir.path(), vec![0.0, 1.0]);
        store.merge(&key("Scen1", Season::Year), stats(1.0));
        assert_eq!(store.pending(), 1);
        assert_eq!(store.persist().unwrap().len(), 1);
        assert_eq!(store.pending(), 0);
        assert!(store.persist().unwrap().is_empty());
    }
}

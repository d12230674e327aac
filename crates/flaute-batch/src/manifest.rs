use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flaute_core::{ErrorKind, Season};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::TaskError;

/// What happened to one task in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub key: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seasons left out because they held no valid sample.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub empty_seasons: Vec<Season>,
}

impl TaskRecord {
    pub fn ok(key: impl Into<String>, empty_seasons: Vec<Season>) -> Self {
        Self {
            key: key.into(),
            status: "ok".into(),
            error_kind: None,
            error: None,
            empty_seasons,
        }
    }

    pub fn failed(key: impl Into<String>, err: &TaskError) -> Self {
        Self {
            key: key.into(),
            status: "error".into(),
            error_kind: Some(err.kind),
            error: Some(err.message.clone()),
            empty_seasons: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub pipeline: String,
    pub target: String,
    pub num_tasks: usize,
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub tasks: Vec<TaskRecord>,
}

/// Returned to the caller after a run, for the summary printout.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub manifest_path: PathBuf,
    pub tasks: Vec<TaskRecord>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter().filter(|record| !record.is_ok())
    }

    /// Whether any task hit a precondition violation.
    pub fn has_fatal(&self) -> bool {
        self.failed()
            .any(|record| record.error_kind == Some(ErrorKind::Precondition))
    }

    pub fn empty_slices(&self) -> usize {
        self.tasks.iter().map(|r| r.empty_seasons.len()).sum()
    }
}

/// Write the manifest of a finished run and build its summary.
pub fn finish_run(
    path: &Path,
    pipeline: &str,
    target: &str,
    skipped: usize,
    mut tasks: Vec<TaskRecord>,
) -> Result<RunSummary> {
    tasks.sort_by(|a, b| a.key.cmp(&b.key));
    let success = tasks.iter().filter(|r| r.is_ok()).count();
    let failure = tasks.len() - success;
    let manifest = RunManifest {
        created_at: Utc::now(),
        pipeline: pipeline.to_string(),
        target: target.to_string(),
        num_tasks: tasks.len(),
        success,
        failure,
        skipped,
        tasks: tasks.clone(),
    };
    write_run_manifest(path, &manifest)?;
    Ok(RunSummary {
        success,
        failure,
        skipped,
        manifest_path: path.to_path_buf(),
        tasks,
    })
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json).with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_manifest(path: &Path) -> Result<RunManifest> {
    let file =
        fs::File::open(path).with_context(|| format!("opening run manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing run manifest '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_writes_and_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("run_manifest.json");
        let records = vec![
            TaskRecord::ok("KARE/x_y/historical", vec![Season::Djf]),
            TaskRecord::failed(
                "Germany/x_y/GWL2K",
                &TaskError {
                    kind: ErrorKind::ToolTimeout,
                    message: "cdo timed out".into(),
                },
            ),
        ];
        let summary = finish_run(&path, "stats", "sfcWind", 3, records).unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failure, 1);
        assert!(!summary.has_fatal());
        assert_eq!(summary.empty_slices(), 1);

        let parsed = load_run_manifest(&path).unwrap();
        assert_eq!(parsed.pipeline, "stats");
        assert_eq!(parsed.skipped, 3);
        assert_eq!(parsed.tasks[0].key, "Germany/x_y/GWL2K");
        assert_eq!(parsed.tasks[0].error_kind, Some(ErrorKind::ToolTimeout));
    }
}

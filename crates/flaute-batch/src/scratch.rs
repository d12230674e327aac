//! Per-task scratch directories.
//!
//! Tasks running at the same time share one scratch root. Each gets a
//! sub-directory named after a SHA-256 digest of its identity, so distinct
//! tasks never touch each other's intermediates. The directory is removed
//! when the [`ScratchSpace`] is dropped, on success and on failure alike.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flaute_io::identity_digest;
use tracing::warn;

/// Directory name for a task identity under the scratch root.
pub fn scratch_name(identity: &str) -> String {
    format!("task-{}", identity_digest(identity))
}

#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    pub fn create(root: &Path, identity: &str) -> Result<Self> {
        let dir = root.join(scratch_name(identity));
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating scratch directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), %err, "failed to remove scratch directory");
            }
        }
    }
}

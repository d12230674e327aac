use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Sibling path an output is written to before being renamed into place.
pub fn staged_path(output: &Path) -> PathBuf {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let mut name = OsString::from(".");
    name.push(output.file_name().unwrap_or_else(|| OsStr::new("output")));
    name.push(".partial");
    parent.join(name)
}

/// Rename a fully written staged file over its final path.
pub fn commit_staged(staged: &Path, output: &Path) -> Result<()> {
    fs::rename(staged, output)
        .with_context(|| format!("moving {} to {}", staged.display(), output.display()))
}

/// Serialize `value` as pretty JSON, staged and renamed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory '{}'", parent.display()))?;
    }
    let staged = staged_path(path);
    let file = fs::File::create(&staged)
        .with_context(|| format!("creating '{}'", staged.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("writing '{}'", staged.display()))?;
    commit_staged(&staged, path)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        fs::File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing '{}'", path.display()))
}

//! Unified error types for the flaute pipeline
//!
//! [`FlauteError`] carries the failure taxonomy the pipeline reports on:
//! fatal preconditions abort a run before any task is scheduled, everything
//! else is scoped to a single task or slice and is retried by re-running.
//!
//! # Example
//!
//! ```ignore
//! use flaute_core::{FlauteError, FlauteResult};
//!
//! fn check_pairs(u: &[String], v: &[String]) -> FlauteResult<()> {
//!     if u.len() != v.len() {
//!         return Err(FlauteError::Precondition("mismatched pairs".into()));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all flaute operations.
#[derive(Error, Debug)]
pub enum FlauteError {
    /// Inputs violate a run-wide precondition (mismatched file pairs,
    /// unknown resolution, changed histogram edges). Aborts the run.
    #[error("Precondition violation: {0}")]
    Precondition(String),

    /// The external dataset tool did not finish in time.
    #[error("External tool timed out after {minutes} min: {command}")]
    ToolTimeout { command: String, minutes: u64 },

    /// A temporal selection left no time samples.
    #[error("Empty time window: {0}")]
    EmptyWindow(String),

    /// A slice contains zero valid (non-missing) samples.
    #[error("Empty slice: {0}")]
    EmptySlice(String),

    /// Any other failure while executing one task.
    #[error("Task failed: {0}")]
    TaskFailure(String),

    /// I/O errors (file access, process spawn, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using FlauteError.
pub type FlauteResult<T> = Result<T, FlauteError>;

/// Stable label for an error, used in run summaries and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Precondition,
    ToolTimeout,
    EmptyWindow,
    EmptySlice,
    TaskFailure,
    Io,
    Parse,
    Config,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Precondition => "precondition",
            ErrorKind::ToolTimeout => "tool-timeout",
            ErrorKind::EmptyWindow => "empty-window",
            ErrorKind::EmptySlice => "empty-slice",
            ErrorKind::TaskFailure => "task-failure",
            ErrorKind::Io => "io",
            ErrorKind::Parse => "parse",
            ErrorKind::Config => "config",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FlauteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlauteError::Precondition(_) => ErrorKind::Precondition,
            FlauteError::ToolTimeout { .. } => ErrorKind::ToolTimeout,
            FlauteError::EmptyWindow(_) => ErrorKind::EmptyWindow,
            FlauteError::EmptySlice(_) => ErrorKind::EmptySlice,
            FlauteError::TaskFailure(_) => ErrorKind::TaskFailure,
            FlauteError::Io(_) => ErrorKind::Io,
            FlauteError::Parse(_) => ErrorKind::Parse,
            FlauteError::Config(_) => ErrorKind::Config,
            FlauteError::Other(_) => ErrorKind::Other,
        }
    }

    /// Only precondition violations abort a whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FlauteError::Precondition(_))
    }

    /// Classify an `anyhow` error, looking through its context chain for a
    /// typed cause. Untyped errors count as task failures.
    pub fn classify(err: &anyhow::Error) -> ErrorKind {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<FlauteError>())
            .map(FlauteError::kind)
            .unwrap_or(ErrorKind::TaskFailure)
    }
}

// Conversion from string-like types for convenience
impl From<String> for FlauteError {
    fn from(s: String) -> Self {
        FlauteError::Other(s)
    }
}

impl From<&str> for FlauteError {
    fn from(s: &str) -> Self {
        FlauteError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for FlauteError {
    fn from(err: serde_json::Error) -> Self {
        FlauteError::Parse(err.to_string())
    }
}

//! Bounded worker pool with per-task failure isolation.
//!
//! Tasks are spawned onto a fixed-size rayon pool and report back over a
//! channel, so the coordinator sees outcomes in completion order (fan-in).
//! An error or panic in one task becomes a [`TaskError`] carrying that
//! task's key; the other tasks keep running.

use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;

use anyhow::{Context, Result};
use flaute_core::{ErrorKind, FlauteError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Why one task did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            kind: FlauteError::classify(err),
            message: format!("{err:#}"),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Precondition
    }
}

#[derive(Debug)]
pub struct TaskOutcome<K, R> {
    pub key: K,
    pub result: Result<R, TaskError>,
}

/// Something the pool can run: it only has to say who it is.
pub trait Keyed {
    type Key: Clone + Display + Send;
    fn key(&self) -> Self::Key;
}

pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Pool with `workers` threads; 0 means one per CPU.
    pub fn new(workers: usize) -> Result<Self> {
        let workers = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("flaute-worker-{i}"))
            .build()
            .context("building worker thread pool")?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every task with at most [`workers`](Self::workers) at a time and
    /// hand each outcome to `sink` as soon as it arrives.
    ///
    /// `sink` runs on the calling thread. If it fails, the remaining outcomes
    /// are drained without being delivered and the first sink error is
    /// returned once all tasks have finished.
    pub fn run<T, R, F, S>(&self, tasks: Vec<T>, execute: F, mut sink: S) -> Result<()>
    where
        T: Keyed + Send,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync,
        S: FnMut(TaskOutcome<T::Key, R>) -> Result<()>,
    {
        let total = tasks.len();
        let execute = &execute;
        self.pool.in_place_scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for task in tasks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let key = task.key();
                    debug!(%key, "task started");
                    let result = match catch_unwind(AssertUnwindSafe(|| execute(&task))) {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(err)) => Err(TaskError::from_anyhow(&err)),
                        Err(panic) => Err(TaskError {
                            kind: ErrorKind::TaskFailure,
                            message: panic_message(panic.as_ref()),
                        }),
                    };
                    if let Err(err) = &result {
                        warn!(%key, kind = %err.kind, "task failed: {}", err.message);
                    }
                    // receiver outlives every sender inside the scope
                    let _ = tx.send(TaskOutcome { key, result });
                });
            }
            drop(tx);

            let mut first_error = None;
            for (done, outcome) in rx.iter().enumerate() {
                if first_error.is_some() {
                    continue;
                }
                debug!(done = done + 1, total, "task finished");
                if let Err(err) = sink(outcome) {
                    first_error = Some(err);
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

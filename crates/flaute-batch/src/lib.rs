//! # flaute-batch: incremental, parallel pipelines
//!
//! - [`task`]: enumerates (region, dataset, scenario) tasks missing from the
//!   [`store`]
//! - [`runner`]: bounded worker pool with per-task failure isolation
//! - [`stats_pipeline`]: slice statistics merged into per-region documents
//! - [`derive`]: wind, capacity-factor and Dunkelflaute files per member
//! - [`external`], [`scratch`]: the external tool and per-task scratch space
//!
//! Re-running a pipeline with the same inputs is cheap: anything already in
//! the store (or on disk, for derived files) is skipped, and failed keys are
//! simply retried.

pub mod context;
pub mod derive;
pub mod external;
pub mod manifest;
pub mod runner;
pub mod scratch;
pub mod stats_pipeline;
pub mod store;
pub mod task;
pub mod variant;

pub use context::{Collaborators, ToolSettings};
pub use derive::{run_derive, DeriveConfig, DeriveReport, DerivedOutputs, MemberInputs};
pub use external::{expect_output, CommandTool, ExternalTool, ProductSpec, ToolCommand, ToolOutcome};
pub use manifest::{load_run_manifest, RunManifest, RunSummary, TaskRecord};
pub use runner::{Keyed, TaskError, TaskOutcome, WorkerPool};
pub use scratch::{scratch_name, ScratchSpace};
pub use stats_pipeline::{plan_stats, product_path, run_stats, StatsConfig, TaskOutput, MANIFEST_FILE};
pub use store::{RegionStore, ResultStore, SliceResult, StoreKey};
pub use task::{build_tasks, StatsTask, TaskKey, TaskPlan};
pub use variant::StatsVariant;

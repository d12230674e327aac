//! # flaute-core: data model for the capacity-factor statistics pipeline
//!
//! Shared types for every stage of the pipeline:
//! - [`GridDataset`]: a `(time, y, x)` cube of one variable, NaN = missing
//! - [`DatasetReference`], [`Resolution`], [`IndexBox`]: where data lives and
//!   which part of the grid a region covers
//! - [`TimeWindow`] and [`Season`]: the temporal slices statistics are
//!   computed over
//! - [`clean_name`]: canonical dataset identity across scenario variants
//! - [`FlauteError`]: the failure taxonomy reported by a run

pub mod dataset;
pub mod error;
pub mod grid;
pub mod naming;
pub mod season;

pub use dataset::{file_name_of, DatasetReference, IndexBox, Resolution, TimeWindow};
pub use error::{ErrorKind, FlauteError, FlauteResult};
pub use grid::GridDataset;
pub use naming::{clean_name, strip_extension};
pub use season::Season;

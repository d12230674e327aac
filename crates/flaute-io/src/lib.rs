//! # flaute-io: archive-facing I/O
//!
//! - [`grid_file`]: gridded time series in tabular long format (CSV, or
//!   Parquet with the `parquet` feature)
//! - [`time_windows`]: scenario time windows per dataset file
//! - [`lookup`]: region index boxes and masks per resolution
//! - [`digest`]: collision-resistant names for scratch artifacts
//! - [`staging`]: write-then-rename helpers for durable outputs

pub mod digest;
pub mod grid_file;
pub mod lookup;
pub mod staging;
pub mod time_windows;

pub use digest::identity_digest;
pub use grid_file::{read_grid, read_mask, write_grid};
pub use lookup::{LookupTables, Mask, RegionLookup, TableLookup};
pub use staging::{read_json, staged_path, write_json};
pub use time_windows::TimeWindows;

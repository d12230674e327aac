//! Temporal and spatial slicing of gridded time series.

pub mod concat;
pub mod diurnal;
pub mod season;
pub mod subset;

pub use concat::concat_time;
pub use diurnal::{hourly_means, HOURS_PER_DAY};
pub use season::split_by_season;
pub use subset::{apply_mask, crop, select_region, select_window};

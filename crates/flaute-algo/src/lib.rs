//! # flaute-algo: numeric models and slice statistics
//!
//! ## Derived variables
//!
//! | variable       | inputs                 | model |
//! |----------------|------------------------|-------|
//! | `sfcWind`      | `ua100m`, `va100m`     | vector magnitude |
//! | `CF_Wind`      | `sfcWind`              | [`Turbine`] power curve |
//! | `CF_PV`        | `tas`, `rsds`          | temperature-corrected [`pv`] efficiency |
//! | `Dunkelflaute` | `CF_Wind`, `CF_PV`     | both below [`LOW_OUTPUT_THRESHOLD`] |
//!
//! ## Statistics
//!
//! [`aggregate`] reduces one slice to [`SliceStats`]: mean, std, 10th/90th/95th
//! percentiles, fixed-bin histogram, diurnal cycle and, for wind speed, the
//! turbine operating regime.

pub mod dunkelflaute;
pub mod power_curve;
pub mod pv;
pub mod stats;
pub mod transform;

pub use dunkelflaute::{dunkelflaute, LOW_OUTPUT_THRESHOLD};
pub use power_curve::{Turbine, CUT_OUT_SPEED};
pub use pv::capacity_factor_grid;
pub use stats::{
    aggregate, nan_mean, nan_percentile, nan_std_with_mean, AggregateOptions, BinSpec,
    OperatingRegime, RegimeThresholds, SliceStats,
};
pub use transform::{compound_low_output, wind_products, wind_speed, SliceTransform, WindProducts};

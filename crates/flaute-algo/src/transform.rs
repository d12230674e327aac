//! Derived-variable transforms shared by the derivation and statistics
//! pipelines.

use std::collections::BTreeMap;
use std::fmt;

use flaute_core::{FlauteResult, GridDataset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dunkelflaute::dunkelflaute;
use crate::power_curve::Turbine;

/// Transform applied to a slice right before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SliceTransform {
    Identity,
    /// Wind speed to turbine capacity factor.
    WindCapacity { turbine: Turbine },
}

impl SliceTransform {
    pub fn apply(&self, slice: GridDataset) -> GridDataset {
        match self {
            SliceTransform::Identity => slice,
            SliceTransform::WindCapacity { turbine } => turbine.apply(&slice),
        }
    }

    /// Variable name the transformed slice carries.
    pub fn output_variable<'a>(&self, input: &'a str) -> &'a str {
        match self {
            SliceTransform::Identity => input,
            SliceTransform::WindCapacity { .. } => "CF_Wind",
        }
    }
}

impl fmt::Display for SliceTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceTransform::Identity => f.write_str("identity"),
            SliceTransform::WindCapacity { turbine } => write!(f, "wind-cf({turbine})"),
        }
    }
}

/// `sfcWind = hypot(ua100m, va100m)`.
pub fn wind_speed(u: &GridDataset, v: &GridDataset) -> FlauteResult<GridDataset> {
    u.zip_map(v, "sfcWind", f64::hypot)
}

/// Wind speed and per-turbine capacity factor of one input chunk.
#[derive(Debug, Clone)]
pub struct WindProducts {
    pub wind: GridDataset,
    pub cf_wind: BTreeMap<Turbine, GridDataset>,
}

/// `sfcWind` and `CF_Wind` for every turbine from the 100 m wind components.
pub fn wind_products(ua100m: &GridDataset, va100m: &GridDataset) -> FlauteResult<WindProducts> {
    debug!(
        steps = ua100m.len_time(),
        ny = ua100m.ny(),
        nx = ua100m.nx(),
        "deriving wind products"
    );
    let wind = wind_speed(ua100m, va100m)?;
    let cf_wind = Turbine::ALL
        .iter()
        .map(|turbine| (*turbine, turbine.apply(&wind)))
        .collect();
    Ok(WindProducts { wind, cf_wind })
}

/// `Dunkelflaute` per turbine from each turbine's `CF_Wind` and the shared
/// `CF_PV`.
pub fn compound_low_output(
    cf_wind: &BTreeMap<Turbine, GridDataset>,
    cf_pv: &GridDataset,
    threshold: f64,
) -> FlauteResult<BTreeMap<Turbine, GridDataset>> {
    cf_wind
        .iter()
        .map(|(turbine, cf)| Ok((*turbine, dunkelflaute(cf, cf_pv, threshold)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dunkelflaute::LOW_OUTPUT_THRESHOLD;
    use crate::pv::capacity_factor_grid;
    use chrono::NaiveDate;

    fn field(variable: &str, value: f64) -> GridDataset {
        let t = NaiveDate::from_ymd_opt(2000, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        GridDataset::filled(variable, vec![t], 2, 2, value)
    }

    #[test]
    fn wind_speed_is_vector_magnitude() {
        let ws = wind_speed(&field("ua100m", 3.0), &field("va100m", 4.0)).unwrap();
        assert_eq!(ws.variable, "sfcWind");
        assert!(ws.values.iter().all(|v| *v == 5.0));
    }

    #[test]
    fn calm_night_is_dunkelflaute_for_both_turbines() {
        let wind = wind_products(&field("ua100m", 1.0), &field("va100m", 1.0)).unwrap();
        assert_eq!(wind.cf_wind.len(), 2);
        let cf_pv = capacity_factor_grid(&field("tas", 283.15), &field("rsds", 0.0)).unwrap();
        let compound = compound_low_output(&wind.cf_wind, &cf_pv, LOW_OUTPUT_THRESHOLD).unwrap();
        for turbine in Turbine::ALL {
            assert!(wind.cf_wind[&turbine].values.iter().all(|v| *v == 0.0));
            assert!(compound[&turbine].values.iter().all(|v| *v == 1.0));
        }
    }

    #[test]
    fn transform_renames_variable() {
        let t = SliceTransform::WindCapacity {
            turbine: Turbine::Turbine5MW,
        };
        let out = t.apply(field("sfcWind", 12.0));
        assert_eq!(out.variable, t.output_variable("sfcWind"));
        assert!(out.values.iter().all(|v| *v == 1.0));
        assert_eq!(SliceTransform::Identity.output_variable("tas"), "tas");
    }
}

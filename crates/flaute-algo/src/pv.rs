//! Photovoltaic capacity factor from air temperature and irradiance.
//!
//! **Algorithm:**
//! 1. Module temperature `T_mod = T_air + (T_NOCT - T_0) * G / G_0`
//! 2. `ΔT = T_mod - T_STC`, `g = G / G_STC`
//! 3. Relative efficiency
//!    `η = (1 + a ΔT) * (1 + c1 ln g + c2 (ln g)^2 + b ΔT)`
//! 4. Capacity factor `η * g`
//!
//! Irradiance is floored at 1 W/m² before step 1 so `ln g` stays finite at
//! night.

use flaute_core::{FlauteResult, GridDataset};

pub const T_NOCT: f64 = 48.0;
pub const T_0: f64 = 20.0;
pub const G_0: f64 = 800.0;
pub const G_STC: f64 = 1000.0;
pub const T_STC: f64 = 25.0;

const A: f64 = 1.20e-3;
const B: f64 = -4.60e-3;
const C1: f64 = 0.033;
const C2: f64 = -0.0092;

pub const KELVIN_OFFSET: f64 = 273.15;
pub const MIN_IRRADIANCE: f64 = 1.0;

/// Module temperature (°C) for air temperature (°C) and irradiance (W/m²).
pub fn module_temperature(t_air: f64, irradiance: f64) -> f64 {
    t_air + (T_NOCT - T_0) * (irradiance / G_0)
}

pub fn relative_efficiency(t_air: f64, irradiance: f64) -> f64 {
    let g = irradiance / G_STC;
    let delta_t = module_temperature(t_air, irradiance) - T_STC;
    let ln_g = g.ln();
    (1.0 + A * delta_t) * (1.0 + C1 * ln_g + C2 * ln_g * ln_g + B * delta_t)
}

/// Capacity factor for air temperature (°C) and irradiance (W/m²).
/// Missing inputs give a missing output.
pub fn capacity_factor(t_air: f64, irradiance: f64) -> f64 {
    if t_air.is_nan() || irradiance.is_nan() {
        return f64::NAN;
    }
    let g = irradiance.max(MIN_IRRADIANCE);
    relative_efficiency(t_air, g) * (g / G_STC)
}

/// `CF_PV` from `tas` (K) and `rsds` (W/m²) on the same grid.
pub fn capacity_factor_grid(tas: &GridDataset, rsds: &GridDataset) -> FlauteResult<GridDataset> {
    tas.zip_map(rsds, "CF_PV", |t_kelvin, g| {
        capacity_factor(t_kelvin - KELVIN_OFFSET, g)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_test_conditions() {
        // at G = 1000 the module runs 35 K above air, so T_air = -10 gives ΔT = 0
        assert!((module_temperature(-10.0, 1000.0) - 25.0).abs() < 1e-12);
        assert!((relative_efficiency(-10.0, 1000.0) - 1.0).abs() < 1e-12);
        assert!((capacity_factor(-10.0, 1000.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn heat_reduces_output() {
        let cool = capacity_factor(10.0, 800.0);
        let hot = capacity_factor(35.0, 800.0);
        assert!(hot < cool);
        assert!(cool > 0.0 && cool < 1.0);
    }

    #[test]
    fn night_is_floored_not_singular() {
        let cf = capacity_factor(5.0, 0.0);
        assert!(cf.is_finite());
        assert!(cf.abs() < 1e-3);
        assert_eq!(capacity_factor(5.0, 0.0), capacity_factor(5.0, 0.5));
        assert!(capacity_factor(f64::NAN, 500.0).is_nan());
    }
}

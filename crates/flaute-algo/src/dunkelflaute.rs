use flaute_core::{FlauteResult, GridDataset};

/// Capacity factor below which a source counts as not producing.
pub const LOW_OUTPUT_THRESHOLD: f64 = 0.2;

/// 1.0 when both wind and PV are below `threshold`, 0.0 otherwise. A missing
/// wind value is missing output whatever PV says.
pub fn indicator(wind_cf: f64, pv_cf: f64, threshold: f64) -> f64 {
    if wind_cf.is_nan() {
        return f64::NAN;
    }
    if wind_cf < threshold && pv_cf < threshold {
        1.0
    } else {
        0.0
    }
}

/// Cell-wise `Dunkelflaute` dataset from `CF_Wind` and `CF_PV`.
pub fn dunkelflaute(
    wind_cf: &GridDataset,
    pv_cf: &GridDataset,
    threshold: f64,
) -> FlauteResult<GridDataset> {
    wind_cf.zip_map(pv_cf, "Dunkelflaute", |w, p| indicator(w, p, threshold))
}

use chrono::NaiveDate;
use flaute_algo::{capacity_factor_grid, dunkelflaute, pv, Turbine, LOW_OUTPUT_THRESHOLD};
use flaute_core::GridDataset;
use ndarray::Array3;

fn grid(variable: &str, values: &[f64]) -> GridDataset {
    let t0 = NaiveDate::from_ymd_opt(2001, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let values = Array3::from_shape_vec((1, 1, values.len()), values.to_vec()).unwrap();
    GridDataset::new(variable, vec![t0], values).unwrap()
}

#[test]
fn five_mw_curve_on_a_grid() {
    let wind = grid("sfcWind", &[3.0, 12.0, 25.0, 26.0, f64::NAN]);
    let cf = Turbine::Turbine5MW.apply(&wind);
    assert_eq!(cf.variable, "CF_Wind");
    let v = cf.values.as_slice().unwrap();
    assert_eq!(&v[..4], &[0.0, 1.0, 1.0, 0.0]);
    assert!(v[4].is_nan());
}

#[test]
fn compound_indicator_cases() {
    let wind = grid("CF_Wind", &[0.1, 0.3, f64::NAN]);
    let pv = grid("CF_PV", &[0.15, 0.1, 0.1]);
    let out = dunkelflaute(&wind, &pv, LOW_OUTPUT_THRESHOLD).unwrap();
    let v = out.values.as_slice().unwrap();
    assert_eq!(v[0], 1.0);
    assert_eq!(v[1], 0.0);
    assert!(v[2].is_nan());
}

#[test]
fn pv_reaches_nameplate_at_standard_conditions() {
    // module at 25 °C under 1000 W/m² needs -10 °C air
    assert!((pv::capacity_factor(-10.0, 1000.0) - 1.0).abs() < 1e-12);

    let tas = grid("tas", &[263.15, 263.15, f64::NAN]);
    let rsds = grid("rsds", &[1000.0, 0.0, 500.0]);
    let cf = capacity_factor_grid(&tas, &rsds).unwrap();
    let v = cf.values.as_slice().unwrap();
    assert!((v[0] - 1.0).abs() < 1e-9);
    assert!(v[1] > 0.0 && v[1] < LOW_OUTPUT_THRESHOLD);
    assert!(v[2].is_nan());
}

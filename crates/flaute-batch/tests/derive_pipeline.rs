mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{collaborators, ramp_grid, twice_daily, write_fixture, FakeTool};
use flaute_algo::{Turbine, LOW_OUTPUT_THRESHOLD};
use flaute_batch::{run_derive, DeriveConfig, MemberInputs};
use flaute_core::ErrorKind;
use flaute_io::read_grid;
use tempfile::TempDir;

fn chunk(root: &Path, variable: &str, index: usize, f: impl Fn(usize) -> f64) -> PathBuf {
    let times: Vec<_> = twice_daily(2001 + index as i32);
    let path = root
        .join("raw")
        .join("CEU-3")
        .join(variable)
        .join(format!("{variable}_{index}.csv"));
    write_fixture(&path, &ramp_grid(variable, times, f));
    path
}

fn member(root: &Path) -> MemberInputs {
    // calm, dark and cold: both capacity factors stay under the threshold
    MemberInputs {
        region: "Germany".into(),
        stem: "CEU-3_MPI_historical".into(),
        ua100m: (0..2).map(|i| chunk(root, "ua100m", i, |_| 1.0)).collect(),
        va100m: (0..2).map(|i| chunk(root, "va100m", i, |_| 1.0)).collect(),
        tas: (0..2).map(|i| chunk(root, "tas", i, |_| 273.15)).collect(),
        rsds: (0..2).map(|i| chunk(root, "rsds", i, |_| 0.0)).collect(),
    }
}

fn config(root: &Path) -> DeriveConfig {
    DeriveConfig {
        output_dir: root.join("out"),
        scratch_dir: root.join("scratch"),
        overwrite: false,
        low_output: LOW_OUTPUT_THRESHOLD,
        workers: 2,
    }
}

#[test]
fn derives_and_concatenates_member_outputs() {
    let dir = TempDir::new().unwrap();
    let member = member(dir.path());
    let config = config(dir.path());
    let collab = collaborators(Arc::new(FakeTool::new(0)));

    let report = run_derive(&member, &config, &collab).unwrap();
    assert!(report.written);
    assert_eq!(report.summary.success, 4);
    assert!(report.outputs.all_exist());

    let wind = read_grid(&report.outputs.wind, "sfcWind").unwrap();
    let per_year = twice_daily(2001).len() + twice_daily(2002).len();
    assert_eq!(wind.len_time(), per_year);
    assert!(wind.times.windows(2).all(|w| w[0] < w[1]));
    assert!((wind.values[[0, 0, 0]] - 2f64.sqrt()).abs() < 1e-9);

    for turbine in Turbine::ALL {
        let compound = read_grid(&report.outputs.dunkelflaute[&turbine], "Dunkelflaute").unwrap();
        assert_eq!(compound.len_time(), per_year);
        assert!(compound.values.iter().all(|v| *v == 1.0));
    }

    // scratch is removed, and a second run is a no-op
    assert_eq!(std::fs::read_dir(&config.scratch_dir).unwrap().count(), 0);
    let again = run_derive(&member, &config, &collab).unwrap();
    assert!(!again.written);
    assert_eq!(again.summary.skipped, 1);
}

#[test]
fn mismatched_wind_components_abort_before_work() {
    let dir = TempDir::new().unwrap();
    let mut member = member(dir.path());
    member.va100m.pop();
    let err = run_derive(&member, &config(dir.path()), &collaborators(Arc::new(FakeTool::new(0))))
        .unwrap_err();
    assert_eq!(flaute_core::FlauteError::classify(&err), ErrorKind::Precondition);
    assert!(!dir.path().join("out").join("Wind").exists());
}

#[test]
fn member_without_solar_inputs_aborts_before_work() {
    let dir = TempDir::new().unwrap();
    let mut member = member(dir.path());
    member.tas.clear();
    member.rsds.clear();
    let err = run_derive(&member, &config(dir.path()), &collaborators(Arc::new(FakeTool::new(0))))
        .unwrap_err();
    assert_eq!(flaute_core::FlauteError::classify(&err), ErrorKind::Precondition);
    assert!(!dir.path().join("out").join("Wind").exists());
    assert!(!dir.path().join("scratch").exists());
}

#[test]
fn failed_chunk_writes_no_final_file() {
    let dir = TempDir::new().unwrap();
    let mut member = member(dir.path());
    member.rsds[1] = dir.path().join("raw").join("CEU-3").join("missing.csv");
    let report = run_derive(
        &member,
        &config(dir.path()),
        &collaborators(Arc::new(FakeTool::new(0))),
    )
    .unwrap();
    assert!(!report.written);
    assert_eq!(report.summary.failure, 1);
    assert!(report.outputs.paths().all(|p| !p.exists()));
}

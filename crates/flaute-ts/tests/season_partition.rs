use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use flaute_core::{GridDataset, Season};
use flaute_ts::split_by_season;
use ndarray::Array3;
use proptest::prelude::*;

fn hourly_series(start_year: i32, years: i32, step_hours: i64) -> GridDataset {
    let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(start_year + years, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut times = Vec::new();
    let mut t = start;
    while t < end {
        times.push(t);
        t += Duration::hours(step_hours);
    }
    let n = times.len();
    GridDataset::new("sfcWind", times, Array3::zeros((n, 1, 1))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn seasons_partition_the_year(start_year in 1950i32..2090, years in 1i32..3, step in 1i64..48) {
        let ds = hourly_series(start_year, years, step);
        let split = split_by_season(&ds);

        let year: BTreeSet<_> = split[&Season::Year].times.iter().copied().collect();
        let mut union = BTreeSet::new();
        let mut total = 0;
        for season in Season::PARTITIONS {
            let part = &split[&season];
            total += part.len_time();
            for t in &part.times {
                prop_assert!(season.contains(t));
                union.insert(*t);
            }
        }
        prop_assert_eq!(total, union.len(), "a timestamp appeared in two seasons");
        prop_assert_eq!(union, year);
    }
}

use std::collections::BTreeMap;

use flaute_core::{GridDataset, Season};

/// Full series under `Year` plus its four disjoint seasonal partitions.
///
/// A season without samples is present with zero time steps; the caller
/// decides how to report it.
pub fn split_by_season(dataset: &GridDataset) -> BTreeMap<Season, GridDataset> {
    let mut buckets: BTreeMap<Season, Vec<usize>> = Season::PARTITIONS
        .iter()
        .map(|season| (*season, Vec::new()))
        .collect();
    for (idx, time) in dataset.times.iter().enumerate() {
        if let Some(bucket) = buckets.get_mut(&Season::of(time)) {
            bucket.push(idx);
        }
    }

    let mut split = BTreeMap::new();
    split.insert(Season::Year, dataset.clone());
    for (season, indices) in buckets {
        split.insert(season, dataset.select_times(&indices));
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use ndarray::Array3;

    fn daily(days: i64) -> GridDataset {
        let start = NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times: Vec<_> = (0..days).map(|d| start + Duration::days(d)).collect();
        let n = times.len();
        GridDataset::new("v", times, Array3::zeros((n, 1, 1))).unwrap()
    }

    #[test]
    fn one_year_splits_into_known_sizes() {
        let split = split_by_season(&daily(365));
        assert_eq!(split[&Season::Year].len_time(), 365);
        assert_eq!(split[&Season::Djf].len_time(), 31 + 28 + 31);
        assert_eq!(split[&Season::Mam].len_time(), 31 + 30 + 31);
        assert_eq!(split[&Season::Jja].len_time(), 30 + 31 + 31);
        assert_eq!(split[&Season::Son].len_time(), 30 + 31 + 30);
    }
}

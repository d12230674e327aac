use chrono::{NaiveDateTime, Timelike};

pub const HOURS_PER_DAY: usize = 24;

/// Mean of `series` per hour of day (0-23), skipping NaN samples.
/// Hours without a valid sample are `None`.
pub fn hourly_means(times: &[NaiveDateTime], series: &[f64]) -> Vec<Option<f64>> {
    let mut sums = [0.0f64; HOURS_PER_DAY];
    let mut counts = [0usize; HOURS_PER_DAY];
    for (time, value) in times.iter().zip(series) {
        if value.is_nan() {
            continue;
        }
        let hour = time.hour() as usize;
        sums[hour] += value;
        counts[hour] += 1;
    }
    sums.iter()
        .zip(counts.iter())
        .map(|(sum, count)| (*count > 0).then(|| sum / *count as f64))
        .collect()
}

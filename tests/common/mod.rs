// Shared test helpers

#![allow(dead_code)]

use statbins::{AggregationSet, TimeSeriesStats};

/// Milliseconds to the microsecond timestamps `add` takes.
pub fn micros(ms: i64) -> i64 {
    ms * 1000
}

pub fn series(num_bins: usize, bin_duration_millis: i64, aggs: AggregationSet) -> TimeSeriesStats {
    TimeSeriesStats::new(num_bins, bin_duration_millis, aggs).expect("valid series config")
}

pub fn keys(series: &TimeSeriesStats) -> Vec<i64> {
    series.snapshot().into_iter().map(|(k, _)| k).collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// Bounded sliding window of fixed-width time bins for one metric.
// Bucket keys are anchored to UTC epoch boundaries, so series with the same bin width line up.
// Every mutation runs under the series' own mutex; series never share a lock.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

use crate::error::StatsError;
use crate::models::{AggregationSet, AggregationType, BinEntry, TimeBin, TimeSeriesSnapshot};

/// Reserved for sub-bucket rounding; carried through snapshots only.
pub const DEFAULT_ROUNDING_FACTOR: i64 = 10_000_000;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;

/// Start (epoch millis) of the bucket containing `timestamp_micros`.
/// Microseconds below one millisecond are truncated, then the time is floored to the
/// greatest multiple of `bin_duration_millis` not exceeding it, pre-epoch times included.
pub fn normalize_timestamp(timestamp_micros: i64, bin_duration_millis: i64) -> i64 {
    let millis = timestamp_micros / 1000;
    millis.div_euclid(bin_duration_millis) * bin_duration_millis
}

/// Shape of a time series: how many bins, how wide, which aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesConfig {
    pub num_bins: usize,
    pub bin_duration_millis: i64,
    pub aggregation_types: AggregationSet,
}

impl TimeSeriesConfig {
    /// Last hour at one-minute resolution.
    pub fn per_hour(aggregation_types: AggregationSet) -> Self {
        Self {
            num_bins: 60,
            bin_duration_millis: MS_PER_MINUTE,
            aggregation_types,
        }
    }

    /// Last day at one-hour resolution.
    pub fn per_day(aggregation_types: AggregationSet) -> Self {
        Self {
            num_bins: 24,
            bin_duration_millis: MS_PER_HOUR,
            aggregation_types,
        }
    }

    pub fn build(self) -> Result<TimeSeriesStats, StatsError> {
        TimeSeriesStats::new(
            self.num_bins,
            self.bin_duration_millis,
            self.aggregation_types,
        )
    }
}

#[derive(Debug)]
pub struct TimeSeriesStats {
    bins: Mutex<BTreeMap<i64, TimeBin>>,
    num_bins: u32,
    bin_duration_millis: i64,
    aggregation_types: AggregationSet,
    rounding_factor: i64,
}

impl TimeSeriesStats {
    pub fn new(
        num_bins: usize,
        bin_duration_millis: i64,
        aggregation_types: AggregationSet,
    ) -> Result<Self, StatsError> {
        let num_bins = match u32::try_from(num_bins) {
            Ok(n) if n > 0 => n,
            _ => return Err(StatsError::InvalidBinCount),
        };
        if bin_duration_millis <= 0 {
            return Err(StatsError::InvalidBinDuration(bin_duration_millis));
        }
        if aggregation_types.is_empty() {
            return Err(StatsError::NoAggregations);
        }
        Ok(Self {
            bins: Mutex::new(BTreeMap::new()),
            num_bins,
            bin_duration_millis,
            aggregation_types,
            rounding_factor: DEFAULT_ROUNDING_FACTOR,
        })
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins as usize
    }

    pub fn bin_duration_millis(&self) -> i64 {
        self.bin_duration_millis
    }

    pub fn aggregation_types(&self) -> AggregationSet {
        self.aggregation_types
    }

    pub fn rounding_factor(&self) -> i64 {
        self.rounding_factor
    }

    pub fn config(&self) -> TimeSeriesConfig {
        TimeSeriesConfig {
            num_bins: self.num_bins(),
            bin_duration_millis: self.bin_duration_millis,
            aggregation_types: self.aggregation_types,
        }
    }

    /// Folds one sample into the bin for its bucket, creating the bin if needed.
    ///
    /// When the window is full and the bucket is new, the oldest bin is evicted, unless the
    /// sample's bucket is older than every bin held, in which case the sample is dropped.
    /// `value` feeds AVG/MIN/MAX/LATEST; `delta` feeds SUM.
    pub fn add(&self, timestamp_micros: i64, value: f64, delta: f64) {
        let key = normalize_timestamp(timestamp_micros, self.bin_duration_millis);
        let mut bins = self.lock();

        if !bins.contains_key(&key) && bins.len() >= self.num_bins() {
            if let Some((&oldest, _)) = bins.first_key_value()
                && key < oldest
            {
                trace!(bucket = key, oldest, "sample older than window; dropped");
                return;
            }
            if let Some((evicted, _)) = bins.pop_first() {
                trace!(bucket = key, evicted, "window full; evicted oldest bin");
            }
        }

        let bin = bins.entry(key).or_default();
        fold_sample(bin, self.aggregation_types, value, delta);
    }

    /// Consistent copy of all bins, ascending by bucket key.
    pub fn snapshot(&self) -> Vec<(i64, TimeBin)> {
        self.lock()
            .iter()
            .map(|(key, bin)| (*key, bin.clone()))
            .collect()
    }

    pub fn bin(&self, key: i64) -> Option<TimeBin> {
        self.lock().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn first_key(&self) -> Option<i64> {
        self.lock().first_key_value().map(|(k, _)| *k)
    }

    pub fn last_key(&self) -> Option<i64> {
        self.lock().last_key_value().map(|(k, _)| *k)
    }

    pub fn to_snapshot(&self) -> TimeSeriesSnapshot {
        let bins = self
            .snapshot()
            .into_iter()
            .map(|(key, bin)| BinEntry { key, bin })
            .collect();
        TimeSeriesSnapshot {
            bins,
            num_bins: self.num_bins,
            bin_duration_millis: self.bin_duration_millis,
            aggregation_types: self.aggregation_types.into(),
            rounding_factor: self.rounding_factor,
        }
    }

    /// Rebuilds a series from an exported snapshot. Bins whose key is not on a bucket
    /// boundary are skipped; if more bins than `num_bins` are present the newest are kept.
    /// Fields of aggregations the series does not track are cleared.
    pub fn from_snapshot(snapshot: TimeSeriesSnapshot) -> Result<Self, StatsError> {
        let mut series = Self::new(
            snapshot.num_bins as usize,
            snapshot.bin_duration_millis,
            snapshot.aggregation_types.into(),
        )?;
        series.rounding_factor = snapshot.rounding_factor;
        {
            let bins = series
                .bins
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner);
            for BinEntry { key, bin } in snapshot.bins {
                if key % series.bin_duration_millis != 0 {
                    warn!(
                        bucket = key,
                        bin_duration_millis = series.bin_duration_millis,
                        "skipping bin not on a bucket boundary"
                    );
                    continue;
                }
                bins.insert(key, retain_active(bin, series.aggregation_types));
            }
            while bins.len() > series.num_bins as usize {
                bins.pop_first();
            }
        }
        Ok(series)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<i64, TimeBin>> {
        // Bin state is plain numbers and consistent between statements, so a poisoned lock is safe to reuse.
        self.bins.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the fields of `bin` whose aggregation is not in `aggregation_types`.
fn retain_active(mut bin: TimeBin, aggregation_types: AggregationSet) -> TimeBin {
    if !aggregation_types.contains(AggregationType::Avg) {
        bin.avg = None;
        bin.var = None;
        bin.count = 0.0;
    }
    if !aggregation_types.contains(AggregationType::Min) {
        bin.min = None;
    }
    if !aggregation_types.contains(AggregationType::Max) {
        bin.max = None;
    }
    if !aggregation_types.contains(AggregationType::Sum) {
        bin.sum = None;
    }
    if !aggregation_types.contains(AggregationType::Latest) {
        bin.latest = None;
    }
    bin
}

/// Applies every active aggregation to `bin` from one `(value, delta)` pair.
fn fold_sample(bin: &mut TimeBin, aggregation_types: AggregationSet, value: f64, delta: f64) {
    for kind in aggregation_types.iter() {
        match kind {
            AggregationType::Avg => match bin.avg {
                None => {
                    bin.avg = Some(value);
                    bin.var = Some(0.0);
                    bin.count = 1.0;
                }
                Some(avg) => {
                    // Welford: mean and M2 updated without revisiting earlier samples
                    bin.count += 1.0;
                    let diff = value - avg;
                    let avg = avg + diff / bin.count;
                    let diff_after = value - avg;
                    bin.avg = Some(avg);
                    bin.var = Some(bin.var.unwrap_or(0.0) + diff * diff_after);
                }
            },
            AggregationType::Sum => {
                bin.sum = Some(bin.sum.map_or(delta, |sum| sum + delta));
            }
            AggregationType::Max => {
                bin.max = Some(bin.max.map_or(value, |max| if value > max { value } else { max }));
            }
            AggregationType::Min => {
                bin.min = Some(bin.min.map_or(value, |min| if value < min { value } else { min }));
            }
            AggregationType::Latest => bin.latest = Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_sample_first_avg_sample_initializes() {
        let mut bin = TimeBin::default();
        fold_sample(&mut bin, AggregationSet::AVG_ONLY, 4.0, 0.0);
        assert_eq!(bin.avg, Some(4.0));
        assert_eq!(bin.var, Some(0.0));
        assert_eq!(bin.count, 1.0);
        assert!(bin.sum.is_none());
    }

    #[test]
    fn fold_sample_latest_always_overwrites() {
        let mut bin = TimeBin::default();
        let latest = AggregationSet::EMPTY.with(AggregationType::Latest);
        fold_sample(&mut bin, latest, 4.0, 0.0);
        fold_sample(&mut bin, latest, -1.0, 0.0);
        assert_eq!(bin.latest, Some(-1.0));
        assert_eq!(bin.count, 0.0);
    }

    #[test]
    fn normalize_truncates_sub_millisecond_micros() {
        assert_eq!(normalize_timestamp(999, 1000), 0);
        assert_eq!(normalize_timestamp(1_999_999, 1000), 1000);
        assert_eq!(normalize_timestamp(2_000_000, 1000), 2000);
    }

    #[test]
    fn normalize_floors_pre_epoch_times() {
        assert_eq!(normalize_timestamp(-1_500_000, 1000), -2000);
        assert_eq!(normalize_timestamp(-1_000_000, 1000), -1000);
        assert_eq!(normalize_timestamp(-1, 1000), 0);
    }

    #[test]
    fn retain_active_clears_untracked_fields() {
        let bin = TimeBin {
            avg: Some(2.0),
            var: Some(1.0),
            count: 3.0,
            min: Some(1.0),
            max: Some(3.0),
            sum: Some(6.0),
            latest: Some(3.0),
        };
        let kept = retain_active(bin, AggregationSet::SUM_ONLY);
        assert_eq!(
            kept,
            TimeBin {
                sum: Some(6.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn presets_have_expected_shape() {
        let hour = TimeSeriesConfig::per_hour(AggregationSet::ALL);
        assert_eq!(hour.num_bins, 60);
        assert_eq!(hour.bin_duration_millis, 60_000);
        let day = TimeSeriesConfig::per_day(AggregationSet::AVG_ONLY);
        assert_eq!(day.num_bins, 24);
        assert_eq!(day.bin_duration_millis, 3_600_000);
    }
}

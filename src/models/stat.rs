// Point-in-time views of metric records and the stats document, for export and encoding.

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

use super::{AggregationType, TimeBin};

pub const LOG_HISTOGRAM_BINS: usize = 15;

/// Power-of-ten histogram counters: bins[0] covers 0..=9, bins[1] 10..=99, and so on.
/// Carried as plain data; nothing in this crate updates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
pub struct LogHistogram {
    pub bins: [u64; LOG_HISTOGRAM_BINS],
}

/// One bucket of a time series, keyed by its normalized start (epoch millis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
pub struct BinEntry {
    pub key: i64,
    pub bin: TimeBin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesSnapshot {
    /// Ascending by key.
    pub bins: Vec<BinEntry>,
    pub num_bins: u32,
    pub bin_duration_millis: i64,
    pub aggregation_types: Vec<AggregationType>,
    pub rounding_factor: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatSnapshot {
    pub name: String,
    pub latest_value: f64,
    pub accumulated_value: f64,
    pub version: u64,
    pub last_update_micros_utc: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_time_micros_utc: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_histogram: Option<LogHistogram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series_stats: Option<TimeSeriesSnapshot>,
}

/// The whole stats document; entries sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatsSnapshot {
    pub kind: String,
    pub entries: Vec<ServiceStatSnapshot>,
}

impl ServiceStatsSnapshot {
    pub fn entry(&self, name: &str) -> Option<&ServiceStatSnapshot> {
        self.entries.iter().find(|e| e.name == name)
    }
}

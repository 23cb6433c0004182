// Plain data models: bins, aggregation kinds, snapshots of records and documents.

mod aggregation;
mod stat;
mod time_bin;

pub use aggregation::{AggregationSet, AggregationType};
pub use stat::{
    BinEntry, LOG_HISTOGRAM_BINS, LogHistogram, ServiceStatSnapshot, ServiceStatsSnapshot,
    TimeSeriesSnapshot,
};
pub use time_bin::TimeBin;

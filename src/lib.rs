// Library for tests to access modules

pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod probe;
pub mod registry;
pub mod sampler;
pub mod time_series;

pub use error::{CodecError, StatsError};
pub use models::{AggregationSet, AggregationType, TimeBin};
pub use registry::{ServiceStat, ServiceStats};
pub use time_series::{TimeSeriesConfig, TimeSeriesStats, normalize_timestamp};

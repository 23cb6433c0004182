// Library error types. Sample ingestion never fails; these cover construction and encoding.

use thiserror::Error;

/// Rejected time-series configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("num_bins must be between 1 and {}", u32::MAX)]
    InvalidBinCount,
    #[error("bin_duration_millis must be > 0, got {0}")]
    InvalidBinDuration(i64),
    #[error("at least one aggregation type is required")]
    NoAggregations,
}

/// Failure while encoding or decoding a stats document.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("buffer overflow: {needed} bytes needed, max {max}")]
    BufferOverflow { needed: usize, max: usize },
    #[error("unsupported document version {0}")]
    UnsupportedVersion(u8),
    #[error("empty document")]
    Empty,
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("wincode encode: {0}")]
    Encode(String),
    #[error("wincode decode: {0}")]
    Decode(String),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

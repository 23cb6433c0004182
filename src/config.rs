use serde::Deserialize;

use crate::models::{AggregationSet, AggregationType};
use crate::time_series::TimeSeriesConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sampler: SamplerConfig,
    pub series: SeriesConfig,
    #[serde(default)]
    pub export: Option<ExportConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    pub sample_interval_ms: u64,
    /// How often to log a summary of every series at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    pub num_bins: usize,
    pub bin_duration_millis: i64,
    pub aggregations: Vec<AggregationType>,
    /// Also keep PerHour / PerDay series for every sampled stat.
    #[serde(default = "default_history")]
    pub history: bool,
}

fn default_history() -> bool {
    true
}

impl SeriesConfig {
    pub fn aggregation_set(&self) -> AggregationSet {
        self.aggregations.iter().copied().collect()
    }

    pub fn time_series(&self) -> TimeSeriesConfig {
        TimeSeriesConfig {
            num_bins: self.num_bins,
            bin_duration_millis: self.bin_duration_millis,
            aggregation_types: self.aggregation_set(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// JSON snapshot of all stats is written here on shutdown.
    pub path: String,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_max_document_bytes() -> usize {
    1024 * 1024
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.sampler.sample_interval_ms > 0,
            "sampler.sample_interval_ms must be > 0, got {}",
            self.sampler.sample_interval_ms
        );
        anyhow::ensure!(
            self.sampler.stats_log_interval_secs > 0,
            "sampler.stats_log_interval_secs must be > 0, got {}",
            self.sampler.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.series.num_bins > 0,
            "series.num_bins must be > 0, got {}",
            self.series.num_bins
        );
        anyhow::ensure!(
            self.series.bin_duration_millis > 0,
            "series.bin_duration_millis must be > 0, got {}",
            self.series.bin_duration_millis
        );
        anyhow::ensure!(
            !self.series.aggregations.is_empty(),
            "series.aggregations must be non-empty"
        );
        if let Some(export) = &self.export {
            anyhow::ensure!(!export.path.is_empty(), "export.path must be non-empty");
            anyhow::ensure!(
                export.max_document_bytes > 0,
                "export.max_document_bytes must be > 0, got {}",
                export.max_document_bytes
            );
        }
        Ok(())
    }
}

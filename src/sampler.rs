// Background sampler: reads the host on an interval and feeds the readings into the stats document.
// A second, slower tick logs a one-line summary of the newest bin of every series.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::{Duration, interval};
use tracing::{Instrument, info, instrument};

use crate::config::SeriesConfig;
use crate::models::ServiceStatsSnapshot;
use crate::probe::{HostProbe, HostSample};
use crate::registry::{ServiceStat, ServiceStats};

pub const CPU_USAGE_STAT: &str = "cpuUsagePercent";
pub const MEMORY_USED_STAT: &str = "memoryUsedBytes";

/// Probe, stats document, counters and shutdown for the sampler.
pub struct SamplerDeps {
    pub probe: Arc<HostProbe>,
    pub stats: Arc<ServiceStats>,
    pub samples_total: Arc<AtomicU64>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Sampler timing. Summary logging uses real-time intervals, independent of sample_interval_ms.
pub struct SamplerTiming {
    pub sample_interval_ms: u64,
    pub stats_log_interval_secs: u64,
}

/// Registers the host stats with the configured series, plus PerHour / PerDay when history is on.
pub fn register_host_stats(stats: &ServiceStats, series: &SeriesConfig) -> anyhow::Result<()> {
    for (name, unit) in [(CPU_USAGE_STAT, "percent"), (MEMORY_USED_STAT, "bytes")] {
        if series.history {
            stats.register_with_history(
                name,
                Some(unit),
                Some(series.time_series()),
                series.aggregation_set(),
            )?;
        } else {
            stats.register(
                ServiceStat::new(name, Some(unit)).with_time_series(series.time_series())?,
            );
        }
    }
    Ok(())
}

pub fn record_sample(stats: &ServiceStats, sample: &HostSample, now_micros: i64) {
    stats.set_stat(CPU_USAGE_STAT, sample.cpu_usage_percent, now_micros);
    stats.set_stat(MEMORY_USED_STAT, sample.memory_used_bytes as f64, now_micros);
}

/// Wall-clock time in microseconds since UNIX epoch; 0 if the clock is before the epoch.
pub fn now_micros() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Logs the newest bin of every stat that keeps a time series.
#[instrument(skip(snapshot), fields(entries = snapshot.entries.len()))]
pub fn log_summary(snapshot: &ServiceStatsSnapshot) {
    for entry in &snapshot.entries {
        let Some(series) = &entry.time_series_stats else {
            continue;
        };
        let Some(newest) = series.bins.last() else {
            continue;
        };
        info!(
            stat = %entry.name,
            bins = series.bins.len(),
            bucket = newest.key,
            count = newest.bin.count,
            avg = ?newest.bin.avg,
            min = ?newest.bin.min,
            max = ?newest.bin.max,
            latest = ?newest.bin.latest,
            "series summary"
        );
    }
}

pub fn spawn(deps: SamplerDeps, timing: SamplerTiming) -> tokio::task::JoinHandle<()> {
    let SamplerDeps {
        probe,
        stats,
        samples_total,
        mut shutdown_rx,
    } = deps;
    let SamplerTiming {
        sample_interval_ms,
        stats_log_interval_secs,
    } = timing;

    let sampler_span = tracing::span!(tracing::Level::DEBUG, "sampler", sample_interval_ms);
    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_millis(sample_interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval fires immediately; skip the empty summary at startup
            stats_log_tick.tick().await;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let sample = match probe.sample().await {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    operation = "sample",
                                    "host sample failed"
                                );
                                continue;
                            }
                        };
                        record_sample(&stats, &sample, now_micros());
                        samples_total.fetch_add(1, Ordering::Relaxed);
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Sampler shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        info!(
                            samples_total = samples_total.load(Ordering::Relaxed),
                            stats = stats.len(),
                            "app stats"
                        );
                        log_summary(&stats.snapshot());
                    }
                }
            }
        }
        .instrument(sampler_span),
    )
}

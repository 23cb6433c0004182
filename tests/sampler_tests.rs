// Sampler tests: host stat registration, sample recording, spawn + shutdown

use statbins::config::AppConfig;
use statbins::probe::{HostProbe, HostSample};
use statbins::registry::{ServiceStats, per_day_name, per_hour_name};
use statbins::sampler::{
    CPU_USAGE_STAT, MEMORY_USED_STAT, SamplerDeps, SamplerTiming, now_micros, record_sample,
    register_host_stats, spawn,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const TEST_CONFIG: &str = r#"
[sampler]
sample_interval_ms = 25
stats_log_interval_secs = 3600

[series]
num_bins = 5
bin_duration_millis = 1000
aggregations = ["AVG", "MAX", "LATEST"]
"#;

#[test]
fn register_host_stats_adds_history_series() {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let stats = ServiceStats::new();
    register_host_stats(&stats, &config.series).unwrap();

    assert_eq!(stats.len(), 6);
    for name in [CPU_USAGE_STAT, MEMORY_USED_STAT] {
        let base = stats.get(name).unwrap();
        assert_eq!(base.time_series_stats.unwrap().num_bins, 5);
        assert!(stats.contains(&per_hour_name(name)));
        assert!(stats.contains(&per_day_name(name)));
    }
}

#[test]
fn register_host_stats_without_history() {
    let cfg = TEST_CONFIG.replace(
        r#"aggregations = ["AVG", "MAX", "LATEST"]"#,
        "aggregations = [\"AVG\"]\nhistory = false",
    );
    let config = AppConfig::load_from_str(&cfg).unwrap();
    let stats = ServiceStats::new();
    register_host_stats(&stats, &config.series).unwrap();
    assert_eq!(stats.names(), vec![CPU_USAGE_STAT, MEMORY_USED_STAT]);
}

#[test]
fn record_sample_feeds_every_series() {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let stats = ServiceStats::new();
    register_host_stats(&stats, &config.series).unwrap();

    let now = 1_700_000_000_250_000_i64;
    record_sample(
        &stats,
        &HostSample {
            cpu_usage_percent: 20.0,
            memory_used_bytes: 1024,
            memory_total_bytes: 4096,
        },
        now,
    );
    record_sample(
        &stats,
        &HostSample {
            cpu_usage_percent: 40.0,
            memory_used_bytes: 2048,
            memory_total_bytes: 4096,
        },
        now + 1_000,
    );

    let cpu = stats.get(CPU_USAGE_STAT).unwrap();
    assert_eq!(cpu.latest_value, 40.0);
    let bin = &cpu.time_series_stats.unwrap().bins[0].bin;
    assert_eq!(bin.avg, Some(30.0));
    assert_eq!(bin.max, Some(40.0));

    let mem_hour = stats.get(&per_hour_name(MEMORY_USED_STAT)).unwrap();
    let bin = &mem_hour.time_series_stats.unwrap().bins[0].bin;
    assert_eq!(bin.latest, Some(2048.0));
    assert_eq!(bin.count, 2.0);
}

#[test]
fn now_micros_is_after_2020() {
    assert!(now_micros() > 1_577_836_800_000_000);
}

#[tokio::test]
async fn sampler_spawn_ticks_and_shutdown() {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let stats = Arc::new(ServiceStats::new());
    register_host_stats(&stats, &config.series).unwrap();

    let samples_total = Arc::new(AtomicU64::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn(
        SamplerDeps {
            probe: Arc::new(HostProbe::new()),
            stats: stats.clone(),
            samples_total: samples_total.clone(),
            shutdown_rx,
        },
        SamplerTiming {
            sample_interval_ms: config.sampler.sample_interval_ms,
            stats_log_interval_secs: config.sampler.stats_log_interval_secs,
        },
    );

    tokio::time::sleep(tokio::time::Duration::from_millis(150)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    let taken = samples_total.load(Ordering::Relaxed);
    assert!(taken > 0, "sampler should have recorded at least one sample");
    let mem = stats.get(MEMORY_USED_STAT).unwrap();
    assert_eq!(mem.version, taken);
    assert!(!mem.time_series_stats.unwrap().bins.is_empty());
}

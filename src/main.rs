use anyhow::Result;
use statbins::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        num_bins = app_config.series.num_bins,
        bin_duration_millis = app_config.series.bin_duration_millis,
        history = app_config.series.history,
        "starting"
    );

    let stats = Arc::new(registry::ServiceStats::new());
    sampler::register_host_stats(&stats, &app_config.series)?;

    let samples_total = Arc::new(AtomicU64::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let sampler_handle = sampler::spawn(
        sampler::SamplerDeps {
            probe: Arc::new(probe::HostProbe::new()),
            stats: stats.clone(),
            samples_total: samples_total.clone(),
            shutdown_rx,
        },
        sampler::SamplerTiming {
            sample_interval_ms: app_config.sampler.sample_interval_ms,
            stats_log_interval_secs: app_config.sampler.stats_log_interval_secs,
        },
    );

    wait_for_shutdown().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = sampler_handle.await;

    if let Some(export) = &app_config.export {
        let document = stats.snapshot();
        let bytes = codec::encode_json(&document, export.max_document_bytes)?;
        if let Some(parent) = std::path::Path::new(&export.path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&export.path, &bytes)?;
        tracing::info!(
            path = %export.path,
            entries = document.entries.len(),
            bytes = bytes.len(),
            "stats exported"
        );
    }
    sampler::log_summary(&stats.snapshot());

    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// Host CPU / memory readings via sysinfo. Blocking refreshes run on the blocking pool.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use sysinfo::System;
use tracing::instrument;

/// One reading of the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    pub cpu_usage_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
}

pub struct HostProbe {
    sys: Arc<Mutex<System>>,
    last_cpu_refresh: Arc<Mutex<Option<(Instant, f64)>>>,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            last_cpu_refresh: Arc::new(Mutex::new(None)),
        }
    }

    #[instrument(skip(self), fields(probe = "host", operation = "sample"))]
    pub async fn sample(&self) -> anyhow::Result<HostSample> {
        let sys = self.sys.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let mut last = last_cpu_refresh
                .lock()
                .map_err(|e| anyhow::anyhow!("cpu refresh lock poisoned: {}", e))?;

            let now = Instant::now();
            let cpu_usage_percent = match *last {
                Some((prev_ts, prev_usage))
                    if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                {
                    // Too soon for a meaningful delta; reuse the previous reading
                    prev_usage
                }
                Some(_) => {
                    sys.refresh_cpu_all();
                    let usage = sys.global_cpu_usage() as f64;
                    *last = Some((now, usage));
                    usage
                }
                None => {
                    // First call establishes the baseline
                    sys.refresh_cpu_all();
                    *last = Some((now, 0.0));
                    0.0
                }
            };

            sys.refresh_memory();
            let memory_total_bytes = sys.total_memory();
            let memory_used_bytes = memory_total_bytes.saturating_sub(sys.available_memory());

            Ok(HostSample {
                cpu_usage_percent: cpu_usage_percent.clamp(0.0, 100.0),
                memory_used_bytes,
                memory_total_bytes,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

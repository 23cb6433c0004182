// Metric records and the stats document that owns them.
// Updates go through set/adjust, which keep the record's scalar fields and its time series in step.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::debug;

use crate::error::StatsError;
use crate::models::{
    AggregationSet, LogHistogram, ServiceStatSnapshot, ServiceStatsSnapshot,
};
use crate::time_series::{TimeSeriesConfig, TimeSeriesStats};

/// Document kind written into every exported snapshot.
pub const KIND: &str = "statbins:ServiceStats";
pub const STAT_NAME_SUFFIX_PER_HOUR: &str = "PerHour";
pub const STAT_NAME_SUFFIX_PER_DAY: &str = "PerDay";

pub fn per_hour_name(name: &str) -> String {
    format!("{name}{STAT_NAME_SUFFIX_PER_HOUR}")
}

pub fn per_day_name(name: &str) -> String {
    format!("{name}{STAT_NAME_SUFFIX_PER_DAY}")
}

/// One named metric: latest and accumulated values plus optional history.
#[derive(Debug)]
pub struct ServiceStat {
    pub name: String,
    pub latest_value: f64,
    pub accumulated_value: f64,
    pub version: u64,
    /// Time, in microseconds since UNIX epoch, of the last update.
    pub last_update_micros_utc: i64,
    pub unit: Option<String>,
    /// Time, in microseconds since UNIX epoch, the value was acquired at the source.
    pub source_time_micros_utc: Option<i64>,
    /// URI of the provider of this stat.
    pub service_reference: Option<String>,
    pub log_histogram: Option<LogHistogram>,
    pub time_series_stats: Option<TimeSeriesStats>,
}

impl ServiceStat {
    pub fn new(name: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            name: name.into(),
            latest_value: 0.0,
            accumulated_value: 0.0,
            version: 0,
            last_update_micros_utc: 0,
            unit: unit.map(str::to_owned),
            source_time_micros_utc: None,
            service_reference: None,
            log_histogram: None,
            time_series_stats: None,
        }
    }

    pub fn with_time_series(mut self, config: TimeSeriesConfig) -> Result<Self, StatsError> {
        self.time_series_stats = Some(config.build()?);
        Ok(self)
    }

    pub fn with_service_reference(mut self, uri: impl Into<String>) -> Self {
        self.service_reference = Some(uri.into());
        self
    }

    pub fn with_log_histogram(mut self) -> Self {
        self.log_histogram = Some(LogHistogram::default());
        self
    }

    pub fn set_source_time(&mut self, source_time_micros_utc: Option<i64>) {
        self.source_time_micros_utc = source_time_micros_utc;
    }

    /// Records a new absolute value. The series sees the value as both value and delta.
    pub fn set(&mut self, value: f64, now_micros: i64) {
        self.version += 1;
        self.accumulated_value += value;
        self.latest_value = value;
        self.last_update_micros_utc = now_micros;
        if let Some(series) = &self.time_series_stats {
            series.add(self.series_timestamp(), value, value);
        }
    }

    /// Moves the value by `delta`. The series sees the new latest value and the delta.
    pub fn adjust(&mut self, delta: f64, now_micros: i64) {
        self.version += 1;
        self.latest_value += delta;
        self.accumulated_value += delta;
        self.last_update_micros_utc = now_micros;
        if let Some(series) = &self.time_series_stats {
            series.add(self.series_timestamp(), self.latest_value, delta);
        }
    }

    // Source time wins when the provider reported one.
    fn series_timestamp(&self) -> i64 {
        self.source_time_micros_utc
            .unwrap_or(self.last_update_micros_utc)
    }

    pub fn to_snapshot(&self) -> ServiceStatSnapshot {
        ServiceStatSnapshot {
            name: self.name.clone(),
            latest_value: self.latest_value,
            accumulated_value: self.accumulated_value,
            version: self.version,
            last_update_micros_utc: self.last_update_micros_utc,
            unit: self.unit.clone(),
            source_time_micros_utc: self.source_time_micros_utc,
            service_reference: self.service_reference.clone(),
            log_histogram: self.log_histogram.clone(),
            time_series_stats: self.time_series_stats.as_ref().map(|s| s.to_snapshot()),
        }
    }

    pub fn from_snapshot(snapshot: ServiceStatSnapshot) -> Result<Self, StatsError> {
        let time_series_stats = snapshot
            .time_series_stats
            .map(TimeSeriesStats::from_snapshot)
            .transpose()?;
        Ok(Self {
            name: snapshot.name,
            latest_value: snapshot.latest_value,
            accumulated_value: snapshot.accumulated_value,
            version: snapshot.version,
            last_update_micros_utc: snapshot.last_update_micros_utc,
            unit: snapshot.unit,
            source_time_micros_utc: snapshot.source_time_micros_utc,
            service_reference: snapshot.service_reference,
            log_histogram: snapshot.log_histogram,
            time_series_stats,
        })
    }
}

type StatHandle = Arc<Mutex<ServiceStat>>;

/// The stats document: metric records keyed by name, each behind its own lock.
#[derive(Debug, Default)]
pub struct ServiceStats {
    entries: RwLock<HashMap<String, StatHandle>>,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `stat`, replacing any entry with the same name.
    pub fn register(&self, stat: ServiceStat) {
        let name = stat.name.clone();
        let replaced = self
            .write_entries()
            .insert(name.clone(), Arc::new(Mutex::new(stat)))
            .is_some();
        debug!(stat = %name, replaced, "stat registered");
    }

    /// Registers `name` (with its own series when `base` is given) plus `<name>PerHour` and
    /// `<name>PerDay` series that follow every update.
    pub fn register_with_history(
        &self,
        name: &str,
        unit: Option<&str>,
        base: Option<TimeSeriesConfig>,
        aggregation_types: AggregationSet,
    ) -> Result<(), StatsError> {
        let mut stat = ServiceStat::new(name, unit);
        if let Some(config) = base {
            stat = stat.with_time_series(config)?;
        }
        let per_hour = ServiceStat::new(per_hour_name(name), unit)
            .with_time_series(TimeSeriesConfig::per_hour(aggregation_types))?;
        let per_day = ServiceStat::new(per_day_name(name), unit)
            .with_time_series(TimeSeriesConfig::per_day(aggregation_types))?;
        self.register(stat);
        self.register(per_hour);
        self.register(per_day);
        Ok(())
    }

    /// Sets `name` (creating a plain stat on first use) and its PerHour/PerDay series.
    pub fn set_stat(&self, name: &str, value: f64, now_micros: i64) {
        for handle in self.handles_for_update(name) {
            lock_stat(&handle).set(value, now_micros);
        }
    }

    /// Adjusts `name` (creating a plain stat on first use) and its PerHour/PerDay series.
    pub fn adjust_stat(&self, name: &str, delta: f64, now_micros: i64) {
        for handle in self.handles_for_update(name) {
            lock_stat(&handle).adjust(delta, now_micros);
        }
    }

    /// Runs `f` on the stat named `name` under its lock.
    pub fn with_stat<R>(&self, name: &str, f: impl FnOnce(&mut ServiceStat) -> R) -> Option<R> {
        let handle = self.read_entries().get(name).cloned()?;
        let mut stat = lock_stat(&handle);
        Some(f(&mut stat))
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatSnapshot> {
        self.with_stat(name, |stat| stat.to_snapshot())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_entries().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_entries().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Point-in-time copy of every record, sorted by name. Each record is copied under its own lock.
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        let handles: Vec<StatHandle> = self.read_entries().values().cloned().collect();
        let mut entries: Vec<ServiceStatSnapshot> = handles
            .iter()
            .map(|handle| lock_stat(handle).to_snapshot())
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        ServiceStatsSnapshot {
            kind: KIND.to_owned(),
            entries,
        }
    }

    pub fn from_snapshot(snapshot: ServiceStatsSnapshot) -> Result<Self, StatsError> {
        let stats = Self::new();
        for entry in snapshot.entries {
            stats.register(ServiceStat::from_snapshot(entry)?);
        }
        Ok(stats)
    }

    // The named stat (created if missing) followed by whichever history series exist.
    fn handles_for_update(&self, name: &str) -> Vec<StatHandle> {
        let mut handles = Vec::with_capacity(3);
        let found = {
            let entries = self.read_entries();
            let own = entries.get(name).cloned();
            let found = own.is_some();
            handles.extend(own);
            for sibling in [per_hour_name(name), per_day_name(name)] {
                if let Some(handle) = entries.get(&sibling) {
                    handles.push(handle.clone());
                }
            }
            found
        };
        if !found {
            let handle = self
                .write_entries()
                .entry(name.to_owned())
                .or_insert_with(|| {
                    debug!(stat = %name, "stat created on first update");
                    Arc::new(Mutex::new(ServiceStat::new(name, None)))
                })
                .clone();
            handles.insert(0, handle);
        }
        handles
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StatHandle>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StatHandle>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_stat(handle: &StatHandle) -> MutexGuard<'_, ServiceStat> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

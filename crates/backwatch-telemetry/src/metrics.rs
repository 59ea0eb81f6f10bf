//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters follow the watch → settle → shrink → sweep flow.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the daemon.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    backups_detected_total: IntCounterVec,
    images_discovered_total: IntCounter,
    settle_outcomes_total: IntCounterVec,
    shrink_jobs_total: IntCounterVec,
    retention_deleted_total: IntCounter,
    retention_failures_total: IntCounter,
    watch_errors_total: IntCounter,
    events_emitted_total: IntCounterVec,
    active_monitors: IntGauge,
    active_jobs: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Folders currently being monitored.
    pub active_monitors: i64,
    /// Shrink jobs currently running.
    pub active_jobs: i64,
    /// Images discovered since start.
    pub images_discovered_total: u64,
    /// Folders deleted by retention sweeps.
    pub retention_deleted_total: u64,
    /// Folders that could not be deleted.
    pub retention_failures_total: u64,
    /// Filesystem notification handling failures.
    pub watch_errors_total: u64,
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}

fn counter(registry: &Registry, name: &'static str, help: &str) -> Result<IntCounter> {
    let collector = IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

fn counter_vec(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec> {
    let collector = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

fn gauge(registry: &Registry, name: &'static str, help: &str) -> Result<IntGauge> {
    let collector = IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let inner = MetricsInner {
            backups_detected_total: counter_vec(
                &registry,
                "backups_detected_total",
                "Backup folders claimed for monitoring by trigger",
                &["trigger"],
            )?,
            images_discovered_total: counter(
                &registry,
                "images_discovered_total",
                "Image artifacts discovered in settled folders",
            )?,
            settle_outcomes_total: counter_vec(
                &registry,
                "settle_outcomes_total",
                "Settle detector outcomes",
                &["outcome"],
            )?,
            shrink_jobs_total: counter_vec(
                &registry,
                "shrink_jobs_total",
                "Shrink jobs finished by status",
                &["status"],
            )?,
            retention_deleted_total: counter(
                &registry,
                "retention_deleted_total",
                "Backup folders deleted by retention sweeps",
            )?,
            retention_failures_total: counter(
                &registry,
                "retention_failures_total",
                "Backup folders that could not be deleted",
            )?,
            watch_errors_total: counter(
                &registry,
                "watch_errors_total",
                "Filesystem notifications that failed to process",
            )?,
            events_emitted_total: counter_vec(
                &registry,
                "events_emitted_total",
                "Domain events emitted by type",
                &["type"],
            )?,
            active_monitors: gauge(&registry, "active_monitors", "Folders being monitored")?,
            active_jobs: gauge(&registry, "active_jobs", "Shrink jobs running")?,
            registry,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Count a claimed backup folder.
    pub fn inc_backup_detected(&self, trigger: &str) {
        self.inner
            .backups_detected_total
            .with_label_values(&[trigger])
            .inc();
    }

    /// Count discovered image artifacts.
    pub fn add_images_discovered(&self, count: u64) {
        self.inner.images_discovered_total.inc_by(count);
    }

    /// Count a settle outcome (`images`, `empty`, `abandoned`, `failed`).
    pub fn inc_settle_outcome(&self, outcome: &str) {
        self.inner
            .settle_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a finished shrink job.
    pub fn inc_shrink_job(&self, status: &str) {
        self.inner
            .shrink_jobs_total
            .with_label_values(&[status])
            .inc();
    }

    /// Record the outcome of a retention sweep.
    pub fn record_retention(&self, deleted: u64, failed: u64) {
        self.inner.retention_deleted_total.inc_by(deleted);
        self.inner.retention_failures_total.inc_by(failed);
    }

    /// Count a failed notification.
    pub fn inc_watch_error(&self) {
        self.inner.watch_errors_total.inc();
    }

    /// Count an emitted event.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Adjust the monitored-folder gauge.
    pub fn add_active_monitors(&self, delta: i64) {
        self.inner.active_monitors.add(delta);
    }

    /// Adjust the running-job gauge.
    pub fn add_active_jobs(&self, delta: i64) {
        self.inner.active_jobs.add(delta);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_monitors: self.inner.active_monitors.get(),
            active_jobs: self.inner.active_jobs.get(),
            images_discovered_total: self.inner.images_discovered_total.get(),
            retention_deleted_total: self.inner.retention_deleted_total.get(),
            retention_failures_total: self.inner.retention_failures_total.get(),
            watch_errors_total: self.inner.watch_errors_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_backup_detected("directory");
        metrics.add_images_discovered(2);
        metrics.inc_settle_outcome("images");
        metrics.inc_shrink_job("completed");
        metrics.record_retention(3, 1);
        metrics.inc_watch_error();
        metrics.inc_event("image_discovered");
        metrics.add_active_monitors(2);
        metrics.add_active_monitors(-1);
        metrics.add_active_jobs(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_monitors, 1);
        assert_eq!(snapshot.active_jobs, 1);
        assert_eq!(snapshot.images_discovered_total, 2);
        assert_eq!(snapshot.retention_deleted_total, 3);
        assert_eq!(snapshot.retention_failures_total, 1);
        assert_eq!(snapshot.watch_errors_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("backups_detected_total"));
        assert!(rendered.contains("shrink_jobs_total"));
        assert!(rendered.contains("settle_outcomes_total"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.add_active_jobs(1);
        assert_eq!(second.snapshot().active_jobs, 0);
        Ok(())
    }
}

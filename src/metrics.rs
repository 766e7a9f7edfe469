//! Prometheus Registry and Exporter Self-Metrics
//!
//! The registry rendered on `/metrics` holds two kinds of collectors:
//!
//! ## Snapshot metrics
//! Inventory facts re-emitted from the current snapshot by
//! [`SnapshotCollector`](crate::snapshot::SnapshotCollector):
//! - `netbox_tenant_baremetal_count`, `netbox_baremetal_info`
//! - RAM and SSD totals, counts and per-module sizes
//!
//! ## Exporter health
//! Updated by the fetch scheduler after every cycle:
//! - `netbox_exporter_up` - 1 if the last fetch cycle succeeded, 0 otherwise
//! - `netbox_exporter_last_success_timestamp_seconds` - Unix time of the last snapshot
//! - `netbox_exporter_fetch_duration_seconds` - Duration of the last fetch cycle
//! - `netbox_exporter_fetch_failures_total` - Failed fetch cycles since start
//! - `netbox_exporter_snapshot_size_bytes` - Size of the last persisted snapshot

use crate::snapshot::{SnapshotCollector, SnapshotStore};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Registry plus the exporter's own health metrics
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    pub up: Arc<Gauge>,
    pub last_success_timestamp_seconds: Arc<Gauge>,
    pub fetch_duration_seconds: Arc<Gauge>,
    pub fetch_failures_total: Arc<IntCounter>,
    pub snapshot_size_bytes: Arc<IntGauge>,
}

impl MetricsCollector {
    pub fn new(store: Arc<SnapshotStore>) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last NetBox fetch cycle succeeded (1=yes, 0=no)")
                .namespace("netbox_exporter"),
        )?;

        let last_success_timestamp_seconds = Gauge::with_opts(
            Opts::new(
                "last_success_timestamp_seconds",
                "Unix timestamp of the last successfully persisted snapshot",
            )
            .namespace("netbox_exporter"),
        )?;

        let fetch_duration_seconds = Gauge::with_opts(
            Opts::new(
                "fetch_duration_seconds",
                "Duration of the last fetch cycle in seconds",
            )
            .namespace("netbox_exporter"),
        )?;

        let fetch_failures_total = IntCounter::with_opts(
            Opts::new("fetch_failures_total", "Number of failed fetch cycles")
                .namespace("netbox_exporter"),
        )?;

        let snapshot_size_bytes = IntGauge::with_opts(
            Opts::new(
                "snapshot_size_bytes",
                "Size of the last persisted snapshot in bytes",
            )
            .namespace("netbox_exporter"),
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(last_success_timestamp_seconds.clone()))?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(snapshot_size_bytes.clone()))?;
        registry.register(Box::new(SnapshotCollector::new(store)?))?;

        Ok(Self {
            registry: Arc::new(registry),
            up: Arc::new(up),
            last_success_timestamp_seconds: Arc::new(last_success_timestamp_seconds),
            fetch_duration_seconds: Arc::new(fetch_duration_seconds),
            fetch_failures_total: Arc::new(fetch_failures_total),
            snapshot_size_bytes: Arc::new(snapshot_size_bytes),
        })
    }

    /// Record a cycle that persisted a snapshot of `size` bytes.
    pub fn record_success(&self, elapsed: Duration, size: usize) {
        self.up.set(1.0);
        self.fetch_duration_seconds.set(elapsed.as_secs_f64());
        self.snapshot_size_bytes.set(size as i64);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.last_success_timestamp_seconds.set(now);
    }

    /// Record a cycle that ended without a new snapshot.
    pub fn record_failure(&self, elapsed: Duration) {
        self.up.set(0.0);
        self.fetch_duration_seconds.set(elapsed.as_secs_f64());
        self.fetch_failures_total.inc();
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

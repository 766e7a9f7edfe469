//! NetBox Fetch Scheduler
//!
//! Background task that rebuilds the snapshot on a fixed interval:
//!
//! 1. list tenants and drop the ignored ones
//! 2. list each tenant's devices, and each device's inventory items
//! 3. derive hardware facts and render the exposition document
//! 4. persist it through the [`SnapshotStore`]
//!
//! # Failure policy
//!
//! Any error in steps 1-3 abandons the whole cycle, so a partial snapshot is never
//! persisted and the previous one stays live. A panic inside a cycle is caught at
//! the cycle boundary and reported as [`ExporterError::RuntimeFault`]; the loop keeps
//! ticking. There is no retry or backoff: the next attempt is the next tick.
//!
//! Cycles never overlap. The first cycle runs immediately at startup.

use crate::config::Config;
use crate::error::{ExporterError, Result};
use crate::exposition::{render_snapshot, DeviceReport, TenantReport};
use crate::facts::extract_facts;
use crate::metrics::MetricsCollector;
use crate::netbox::source::InventorySource;
use crate::netbox::types::Tenant;
use crate::snapshot::SnapshotStore;
use futures_util::{stream, FutureExt, StreamExt, TryStreamExt};
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Tenant names and slugs excluded from snapshots, compared case-insensitively
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    entries: HashSet<String>,
}

impl IgnoreList {
    pub fn new<I, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| e.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_ignored(&self, tenant: &Tenant) -> bool {
        self.entries.contains(&tenant.slug.to_lowercase())
            || self.entries.contains(&tenant.name.to_lowercase())
    }
}

/// Drop ignored tenants, keeping API order.
pub fn filter_tenants(tenants: Vec<Tenant>, ignore: &IgnoreList) -> Vec<Tenant> {
    tenants
        .into_iter()
        .filter(|t| !ignore.is_ignored(t))
        .collect()
}

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub interval: Duration,
    pub ignore: IgnoreList,
    /// Inventory-item requests in flight at once within a tenant
    pub inventory_concurrency: usize,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.snapshot.fetch_interval_seconds),
            ignore: IgnoreList::new(&config.netbox.ignore_tenants),
            inventory_concurrency: config.snapshot.inventory_concurrency,
        }
    }
}

pub struct Fetcher<S> {
    source: Arc<S>,
    store: Arc<SnapshotStore>,
    metrics: MetricsCollector,
    options: FetchOptions,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<S: InventorySource> Fetcher<S> {
    pub fn new(
        source: Arc<S>,
        store: Arc<SnapshotStore>,
        metrics: MetricsCollector,
        options: FetchOptions,
    ) -> Self {
        Self {
            source,
            store,
            metrics,
            options,
        }
    }

    /// Fetch everything and derive per-tenant reports (steps 1-2)
    pub async fn build_reports(&self) -> Result<Vec<TenantReport>> {
        let tenants = self.source.list_tenants().await?;
        let total = tenants.len();
        let tenants = filter_tenants(tenants, &self.options.ignore);
        debug!(
            "Fetched {} tenants ({} ignored)",
            total,
            total - tenants.len()
        );

        let mut reports = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            let devices = self.source.list_devices_for_tenant(&tenant.slug).await?;

            // `buffered` keeps API order, so the rendered document stays deterministic.
            let devices = stream::iter(devices)
                .map(|device| async move {
                    let items = self.source.list_inventory_items(device.id).await?;
                    let facts = extract_facts(&device.model, &items);
                    Ok::<_, ExporterError>(DeviceReport { device, facts })
                })
                .buffered(self.options.inventory_concurrency.max(1))
                .try_collect::<Vec<_>>()
                .await?;

            debug!("Tenant {}: {} devices", tenant.slug, devices.len());
            reports.push(TenantReport { tenant, devices });
        }

        Ok(reports)
    }

    /// Build the complete document for one cycle (steps 1-3)
    pub async fn build_snapshot(&self) -> Result<String> {
        let reports = self.build_reports().await?;
        Ok(render_snapshot(&reports))
    }

    async fn cycle(&self) -> Result<usize> {
        let document = self.build_snapshot().await?;
        let size = document.len();

        // Blocking file I/O stays off the runtime workers. The write finishes even
        // if this cycle is abandoned at the await.
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.write(document.as_bytes()))
            .await
            .map_err(|e| ExporterError::RuntimeFault(format!("snapshot write task failed: {}", e)))??;

        Ok(size)
    }

    /// One cycle inside a fault boundary: a panic becomes `RuntimeFault`.
    async fn guarded_cycle(&self) -> Result<usize> {
        match AssertUnwindSafe(self.cycle()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ExporterError::RuntimeFault(panic_message(panic.as_ref()))),
        }
    }

    /// Run one fetch cycle, record its outcome, and return the persisted size.
    ///
    /// Errors are logged and returned for inspection; none of them is fatal.
    pub async fn run_once(&self) -> Result<usize> {
        info!("Fetching latest NetBox snapshot");
        let started = Instant::now();
        let result = self.guarded_cycle().await;
        let elapsed = started.elapsed();

        match &result {
            Ok(size) => {
                self.metrics.record_success(elapsed, *size);
                info!("Snapshot updated (size={} bytes)", size);
            }
            Err(e) => {
                self.metrics.record_failure(elapsed);
                error!("Fetch cycle failed, keeping previous snapshot: {}", e);
            }
        }

        result
    }

    /// Tick until `shutdown` flips or its sender goes away.
    ///
    /// An in-flight cycle is abandoned at its next await point on shutdown.
    /// Persisting has no await inside it, so this never leaves a torn snapshot.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting NetBox fetcher (interval={:?}, snapshot={})",
            self.options.interval,
            self.store.path().display()
        );

        let mut ticker = interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = self.run_once() => {}
                _ = shutdown.changed() => {
                    warn!("Shutdown requested, abandoning in-flight fetch cycle");
                    break;
                }
            }
        }

        info!("NetBox fetcher stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

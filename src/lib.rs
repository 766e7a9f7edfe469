//! NetBox Prometheus Exporter
//!
//! Publishes bare-metal inventory facts from NetBox as Prometheus metrics.
//!
//! # Overview
//!
//! Walking the NetBox API for every scrape is slow and would hammer NetBox, so the
//! exporter decouples the two: a background task periodically fetches tenants,
//! devices and inventory items, derives hardware facts (server generation, RAM and SSD
//! module sizes), and persists them as a text exposition snapshot. Scrapes re-read
//! and re-parse whatever snapshot is current.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   REST (paginated)   ┌──────────────────────────────────────┐
//! │   NetBox    │ ◄──────────────────  │  Fetcher ─► Facts ─► Renderer        │
//! └─────────────┘                      │                         │            │
//!                                      │                         ▼            │
//!                                      │               SnapshotStore          │
//!                                      │             (file + in-memory)       │
//!                                      │                         │            │
//!                                      │                         ▼            │      HTTP      ┌────────────┐
//!                                      │  Registry ◄── SnapshotCollector      │ ◄────────────► │ Prometheus │
//!                                      └──────────────────────────────────────┘   /metrics     └────────────┘
//! ```
//!
//! # Modules
//!
//! - [`netbox`] - REST client, wire types and the [`InventorySource`](netbox::InventorySource) seam
//! - [`facts`] - hardware fact extraction from models and inventory items
//! - [`exposition`] - snapshot document rendering and parsing
//! - [`snapshot`] - atomic snapshot storage and the scrape-time collector
//! - [`fetcher`] - fetch scheduler
//! - [`metrics`] - registry and exporter self-metrics
//! - [`server`] - HTTP server and wiring
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use netbox_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exposition;
pub mod facts;
pub mod fetcher;
pub mod metrics;
pub mod netbox;
pub mod server;
pub mod snapshot;

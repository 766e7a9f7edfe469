use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::ExporterError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub netbox: NetboxConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetboxConfig {
    /// `host[:port]` without scheme; the scheme follows `use_tls`.
    pub address: String,
    #[serde(default)]
    pub token: Option<SecretString>,
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_device_role")]
    pub device_role: String,
    #[serde(default = "default_tenant_page_size")]
    pub tenant_page_size: u32,
    #[serde(default = "default_device_page_size")]
    pub device_page_size: u32,
    #[serde(default = "default_inventory_page_size")]
    pub inventory_page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Tenant names or slugs to leave out of the snapshot (case-insensitive).
    #[serde(default)]
    pub ignore_tenants: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_seconds: u64,
    #[serde(default = "default_inventory_concurrency")]
    pub inventory_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
            fetch_interval_seconds: default_fetch_interval(),
            inventory_concurrency: default_inventory_concurrency(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    20
}

fn default_device_role() -> String {
    "server".to_string()
}

fn default_tenant_page_size() -> u32 {
    2000
}

fn default_device_page_size() -> u32 {
    2000
}

fn default_inventory_page_size() -> u32 {
    500
}

fn default_max_pages() -> usize {
    100
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("/tmp/netbox.prom")
}

fn default_fetch_interval() -> u64 {
    300
}

fn default_inventory_concurrency() -> usize {
    4
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("NETBOX_EXPORTER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("netbox.ignore_tenants")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .netbox
            .resolve_token()
            .context("Failed to resolve NetBox token")?;

        Ok(config)
    }

    /// Reject settings the exporter cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ExporterError> {
        let netbox = &self.netbox;
        if netbox.address.trim().is_empty() {
            return Err(ExporterError::Config("netbox.address is empty".to_string()));
        }
        if netbox.token().expose_secret().is_empty() {
            return Err(ExporterError::Config(
                "netbox.token or netbox.token_path must be set".to_string(),
            ));
        }
        if netbox.request_timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "netbox.request_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if netbox.tenant_page_size == 0
            || netbox.device_page_size == 0
            || netbox.inventory_page_size == 0
        {
            return Err(ExporterError::Config(
                "NetBox page sizes must be greater than zero".to_string(),
            ));
        }
        if netbox.max_pages == 0 {
            return Err(ExporterError::Config(
                "netbox.max_pages must be greater than zero".to_string(),
            ));
        }
        if self.snapshot.fetch_interval_seconds == 0 {
            return Err(ExporterError::Config(
                "snapshot.fetch_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.snapshot.path.as_os_str().is_empty() {
            return Err(ExporterError::Config("snapshot.path is empty".to_string()));
        }
        if !self.server.metrics_path.starts_with('/') {
            return Err(ExporterError::Config(
                "server.metrics_path must start with '/'".to_string(),
            ));
        }
        if matches!(self.server.metrics_path.as_str(), "/" | "/health") {
            return Err(ExporterError::Config(format!(
                "server.metrics_path {} collides with a built-in endpoint",
                self.server.metrics_path
            )));
        }
        // The router treats these as captures and wildcards
        if self.server.metrics_path.contains(['{', '}', '*', ':']) {
            return Err(ExporterError::Config(format!(
                "server.metrics_path {} must be a literal path",
                self.server.metrics_path
            )));
        }
        Ok(())
    }
}

impl NetboxConfig {
    /// The bearer token, empty when none is configured.
    pub fn token(&self) -> SecretString {
        self.token
            .clone()
            .unwrap_or_else(|| SecretString::from(String::new()))
    }

    /// Fill `token` from `token_path` when no inline token is set.
    pub fn resolve_token(&mut self) -> std::result::Result<(), ExporterError> {
        let has_inline = self
            .token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().trim().is_empty());
        if has_inline {
            return Ok(());
        }

        if let Some(path) = &self.token_path {
            let data = std::fs::read_to_string(path).map_err(|e| {
                ExporterError::Config(format!(
                    "could not read netbox token file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            self.token = Some(SecretString::from(data.trim().to_string()));
        }

        Ok(())
    }
}

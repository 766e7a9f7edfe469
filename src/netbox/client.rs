//! NetBox REST API Client
//!
//! Read-only client for the NetBox inventory API.
//!
//! # Protocol
//!
//! - **Transport**: HTTP(S) `GET` against `{scheme}://{address}/api/...`
//! - **Authentication**: static token passed as `Authorization: Token <token>`
//! - **Pagination**: `{count, next, previous, results}` envelopes; `next` links are
//!   followed until exhausted, bounded by `max_pages`, and always rebased onto the
//!   configured origin
//!
//! The client never retries. A failed request surfaces as a fetch error carrying the
//! endpoint and the raw response body, and the fetch scheduler decides what to do
//! with it (it abandons the cycle and waits for the next tick).
//!
//! # Example
//!
//! ```no_run
//! use netbox_exporter::config::NetboxConfig;
//! use netbox_exporter::netbox::{InventorySource, NetboxClient};
//! use secrecy::SecretString;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = NetboxConfig {
//!     address: "netbox.example.com".to_string(),
//!     token: Some(SecretString::from("your-token")),
//!     token_path: None,
//!     use_tls: true,
//!     verify_ssl: true,
//!     request_timeout_seconds: 20,
//!     device_role: "server".to_string(),
//!     tenant_page_size: 2000,
//!     device_page_size: 2000,
//!     inventory_page_size: 500,
//!     max_pages: 100,
//!     ignore_tenants: vec![],
//! };
//!
//! let client = NetboxClient::new(&config)?;
//! let tenants = client.list_tenants().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::NetboxConfig;
use crate::error::{ExporterError, Result};
use crate::netbox::source::InventorySource;
use crate::netbox::types::{Device, DeviceRecord, InventoryItem, Page, Tenant};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{IntoUrl, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const TENANTS_PATH: &str = "/tenancy/tenants/";
const DEVICES_PATH: &str = "/dcim/devices/";
const INVENTORY_ITEMS_PATH: &str = "/dcim/inventory-items/";

/// Client for the NetBox REST API
///
/// Cheap to share: the underlying `reqwest::Client` pools connections internally.
pub struct NetboxClient {
    http: reqwest::Client,
    origin: Url,
    token: SecretString,
    device_role: String,
    tenant_page_size: u32,
    device_page_size: u32,
    inventory_page_size: u32,
    max_pages: usize,
}

impl NetboxClient {
    pub fn new(config: &NetboxConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_seconds));

        if config.use_tls && !config.verify_ssl {
            // Self-signed NetBox deployments
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| ExporterError::Config(format!("failed to build HTTP client: {}", e)))?;

        let scheme = if config.use_tls { "https" } else { "http" };
        let origin = format!("{}://{}", scheme, config.address.trim_end_matches('/'));
        let origin = Url::parse(&origin).map_err(|e| {
            ExporterError::Config(format!("invalid NetBox address {}: {}", config.address, e))
        })?;

        Ok(Self {
            http,
            origin,
            token: config.token(),
            device_role: config.device_role.clone(),
            tenant_page_size: config.tenant_page_size,
            device_page_size: config.device_page_size,
            inventory_page_size: config.inventory_page_size,
            max_pages: config.max_pages,
        })
    }

    /// Base URL of the REST API, e.g. `https://netbox.example.com/api`
    pub fn base_url(&self) -> String {
        format!("{}/api", self.origin.as_str().trim_end_matches('/'))
    }

    fn get<U: IntoUrl>(&self, url: U) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header(
                AUTHORIZATION,
                format!("Token {}", self.token.expose_secret()),
            )
            .header(ACCEPT, "application/json")
    }

    /// Fetch every page of a collection
    ///
    /// The first request carries `query`; later requests follow the `next` link,
    /// which already encodes the query and offset. Only the link's path and query
    /// are used, so the token is never sent anywhere but the configured origin.
    async fn list_all<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let first = format!("{}{}", self.base_url(), path);
        let mut request = self.get(first.as_str()).query(query);
        let mut endpoint = path.to_string();
        let mut results = Vec::new();
        let mut reported = None;

        for _ in 0..self.max_pages {
            let page: Page<T> = self.fetch_page(request, &endpoint).await?;
            reported = reported.or(page.count);
            results.extend(page.results);

            match page.next {
                Some(next) if !next.is_empty() => {
                    let url = self.rebase(&next, &endpoint)?;
                    endpoint = url.to_string();
                    request = self.get(url);
                }
                _ => {
                    if let Some(count) = reported {
                        if count != results.len() as u64 {
                            warn!(
                                "NetBox reported {} records for {} but returned {}",
                                count,
                                path,
                                results.len()
                            );
                        }
                    }
                    return Ok(results);
                }
            }
        }

        Err(ExporterError::Pagination {
            endpoint: path.to_string(),
            pages: self.max_pages,
        })
    }

    /// Resolve a `next` link against the configured origin
    ///
    /// Scheme, host and port of the link are discarded.
    fn rebase(&self, link: &str, endpoint: &str) -> Result<Url> {
        let target = self.origin.join(link).map_err(|e| ExporterError::Link {
            endpoint: endpoint.to_string(),
            link: link.to_string(),
            reason: e.to_string(),
        })?;

        if target.origin() != self.origin.origin() {
            debug!("Rebasing next link {} onto {}", link, self.origin);
        }

        let mut url = self.origin.clone();
        url.set_path(target.path());
        url.set_query(target.query());
        Ok(url)
    }

    async fn fetch_page<T>(&self, request: reqwest::RequestBuilder, endpoint: &str) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", endpoint);

        let transport = |source| ExporterError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(ExporterError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str(&body) {
            Ok(page) => Ok(page),
            Err(source) => Err(ExporterError::Decode {
                endpoint: endpoint.to_string(),
                source,
                body,
            }),
        }
    }
}

impl InventorySource for NetboxClient {
    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        self.list_all(
            TENANTS_PATH,
            &[("limit", self.tenant_page_size.to_string())],
        )
        .await
    }

    async fn list_devices_for_tenant(&self, slug: &str) -> Result<Vec<Device>> {
        let records: Vec<DeviceRecord> = self
            .list_all(
                DEVICES_PATH,
                &[
                    ("role", self.device_role.clone()),
                    ("tenant", slug.to_string()),
                    ("limit", self.device_page_size.to_string()),
                    ("expand", "device_type".to_string()),
                ],
            )
            .await?;

        Ok(records.into_iter().map(Device::from).collect())
    }

    async fn list_inventory_items(&self, device_id: u64) -> Result<Vec<InventoryItem>> {
        self.list_all(
            INVENTORY_ITEMS_PATH,
            &[
                ("device_id", device_id.to_string()),
                ("limit", self.inventory_page_size.to_string()),
            ],
        )
        .await
    }
}

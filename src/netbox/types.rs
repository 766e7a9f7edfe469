//! NetBox API Type Definitions
//!
//! Wire types for the three NetBox collections the exporter reads, plus the flat
//! domain records handed to the fact extractor and renderer.
//!
//! # Endpoints Covered
//!
//! - `GET /api/tenancy/tenants/` → [`Tenant`]
//! - `GET /api/dcim/devices/` → [`DeviceRecord`] → [`Device`]
//! - `GET /api/dcim/inventory-items/` → [`InventoryItem`]
//!
//! Every collection is wrapped in a paginated [`Page`] envelope. NetBox returns
//! `null` for many nested references (a device without a site, an unassigned
//! tenant), so nested objects are optional and collapse to empty strings in the
//! domain records.

use serde::Deserialize;

/// Paginated collection envelope: `{count, next, previous, results}`
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    /// Absolute URL of the next page, `null` on the last one
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TenantRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceTypeRef {
    #[serde(default)]
    pub model: Option<String>,
}

/// Device as returned by `dcim/devices`
///
/// NetBox 3.6 renamed `device_role` to `role`; both spellings are accepted.
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceRecord {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site: Option<NamedRef>,
    #[serde(default)]
    pub tenant: Option<TenantRef>,
    #[serde(default, alias = "device_role")]
    pub role: Option<NamedRef>,
    #[serde(default)]
    pub device_type: Option<DeviceTypeRef>,
}

/// Flattened device the rest of the exporter works with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Device {
    pub id: u64,
    pub name: String,
    pub site_name: String,
    pub tenant_slug: String,
    pub role: String,
    pub model: String,
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        fn name_of(r: Option<NamedRef>) -> String {
            r.and_then(|r| r.name).unwrap_or_default()
        }

        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            site_name: name_of(record.site),
            tenant_slug: record.tenant.and_then(|t| t.slug).unwrap_or_default(),
            role: name_of(record.role),
            model: record
                .device_type
                .and_then(|t| t.model)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

//! Exposition Format
//!
//! The snapshot is exchanged between the fetch scheduler and the scrape path as a
//! plain-text exposition document, one sample per line:
//!
//! ```text
//! # NetBox snapshot exporter
//! netbox_tenant_baremetal_count{tenant="acme"} 2
//! netbox_baremetal_info{id="7",name="srv-01",site="fra1",tenant="acme"} 10
//! netbox_baremetal_ram_total_gb{id="7",name="srv-01",site="fra1",tenant="acme"} 64
//! ```
//!
//! The same document is the on-disk durability format, so [`render`] and [`parse`]
//! must agree on everything either side can express: family names, ordered label
//! sets, label escaping and numeric values.
//!
//! # Modules
//!
//! - [`render`] - facts → document
//! - [`parse`] - document → typed [`MetricFamily`] values

pub mod parse;
pub mod render;

pub use parse::{parse_exposition, Exposition};
pub use render::{render_snapshot, snapshot_samples, DeviceReport, TenantReport};

/// Value type of a metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    Counter,
    #[default]
    Gauge,
    Untyped,
}

impl ValueKind {
    /// Map a `# TYPE` keyword. Types this exporter cannot re-emit as a single
    /// value (histogram, summary, ...) degrade to untyped.
    pub fn from_type_keyword(keyword: &str) -> Self {
        match keyword {
            "counter" => Self::Counter,
            "gauge" => Self::Gauge,
            _ => Self::Untyped,
        }
    }
}

/// One sample line
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub family_name: String,
    /// Label pairs in the family's label-name order
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub kind: ValueKind,
}

impl MetricSample {
    pub fn label_values(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(_, v)| v.as_str())
    }
}

/// A named group of samples sharing one label schema
///
/// Every sample's label vector has the same length as `label_names` and is
/// positionally aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: ValueKind,
    pub label_names: Vec<String>,
    pub samples: Vec<MetricSample>,
}

/// Static description of a family the renderer emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySpec {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

const DEVICE_LABELS: &[&str] = &["id", "name", "site", "tenant"];
const MODULE_LABELS: &[&str] = &["id", "name", "site", "tenant", "index"];

pub const TENANT_BAREMETAL_COUNT: FamilySpec = FamilySpec {
    name: "netbox_tenant_baremetal_count",
    help: "Number of bare-metal servers assigned to the tenant",
    labels: &["tenant"],
};

pub const BAREMETAL_INFO: FamilySpec = FamilySpec {
    name: "netbox_baremetal_info",
    help: "Bare-metal server; the value is the hardware generation (0 = unknown)",
    labels: DEVICE_LABELS,
};

pub const RAM_TOTAL_GB: FamilySpec = FamilySpec {
    name: "netbox_baremetal_ram_total_gb",
    help: "Total installed RAM in GB",
    labels: DEVICE_LABELS,
};

pub const RAM_MODULE_COUNT: FamilySpec = FamilySpec {
    name: "netbox_baremetal_ram_module_count",
    help: "Number of RAM modules found in inventory",
    labels: DEVICE_LABELS,
};

pub const RAM_MODULE_SIZE_GB: FamilySpec = FamilySpec {
    name: "netbox_baremetal_ram_module_size_gb",
    help: "Size of one RAM module in GB (index is 1-based, in inventory order)",
    labels: MODULE_LABELS,
};

pub const SSD_TOTAL_GB: FamilySpec = FamilySpec {
    name: "netbox_baremetal_ssd_total_gb",
    help: "Total SSD capacity in GB",
    labels: DEVICE_LABELS,
};

pub const SSD_COUNT: FamilySpec = FamilySpec {
    name: "netbox_baremetal_ssd_count",
    help: "Number of SSDs found in inventory",
    labels: DEVICE_LABELS,
};

pub const SSD_MODULE_SIZE_GB: FamilySpec = FamilySpec {
    name: "netbox_baremetal_ssd_module_size_gb",
    help: "Size of one SSD in GB (index is 1-based, in inventory order)",
    labels: MODULE_LABELS,
};

/// Every family a snapshot can contain, in first-emission order
pub const SNAPSHOT_FAMILIES: &[FamilySpec] = &[
    TENANT_BAREMETAL_COUNT,
    BAREMETAL_INFO,
    RAM_TOTAL_GB,
    RAM_MODULE_COUNT,
    RAM_MODULE_SIZE_GB,
    SSD_TOTAL_GB,
    SSD_COUNT,
    SSD_MODULE_SIZE_GB,
];

pub fn family_spec(name: &str) -> Option<&'static FamilySpec> {
    SNAPSHOT_FAMILIES.iter().find(|f| f.name == name)
}

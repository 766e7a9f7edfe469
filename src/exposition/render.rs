//! Snapshot Rendering
//!
//! Serializes tenant/device facts into the exposition document. Line order is
//! fixed and follows the order the inventory API returned tenants and devices:
//!
//! 1. `netbox_tenant_baremetal_count{tenant}` for the tenant
//! 2. per device, `netbox_baremetal_info{id,name,site,tenant}` = generation
//! 3. per device, RAM total, RAM module count, then one module size line per module
//! 4. per device, the same three for SSDs
//!
//! Count and total lines are always written, even when zero, so a device with no
//! recognised inventory still shows up with explicit zeros.

use super::{
    FamilySpec, MetricSample, ValueKind, BAREMETAL_INFO, RAM_MODULE_COUNT, RAM_MODULE_SIZE_GB,
    RAM_TOTAL_GB, SSD_COUNT, SSD_MODULE_SIZE_GB, SSD_TOTAL_GB, TENANT_BAREMETAL_COUNT,
};
use crate::facts::HardwareFacts;
use crate::netbox::types::{Device, Tenant};

const HEADER: &str = "# NetBox snapshot exporter";

/// A device and the facts derived for it this cycle
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReport {
    pub device: Device,
    pub facts: HardwareFacts,
}

/// A tenant that survived filtering, with its devices in API order
#[derive(Debug, Clone, PartialEq)]
pub struct TenantReport {
    pub tenant: Tenant,
    pub devices: Vec<DeviceReport>,
}

/// Counts and module sizes print as integers, totals as fixed zero-decimal floats.
#[derive(Debug, Clone, Copy)]
enum LineValue {
    Integer(u64),
    Fixed(f64),
}

impl LineValue {
    fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Fixed(v) => v,
        }
    }

    fn write(self, buf: &mut String) {
        match self {
            Self::Integer(v) => buf.push_str(&v.to_string()),
            Self::Fixed(v) => buf.push_str(&format!("{:.0}", v)),
        }
    }
}

struct Line {
    family: &'static FamilySpec,
    values: Vec<String>,
    value: LineValue,
}

impl Line {
    fn new(family: &'static FamilySpec, values: Vec<String>, value: LineValue) -> Self {
        debug_assert_eq!(family.labels.len(), values.len());
        Self {
            family,
            values,
            value,
        }
    }
}

fn device_labels(device: &Device) -> Vec<String> {
    vec![
        device.id.to_string(),
        device.name.clone(),
        device.site_name.clone(),
        device.tenant_slug.clone(),
    ]
}

fn module_lines(
    lines: &mut Vec<Line>,
    family: &'static FamilySpec,
    base: &[String],
    modules: &[u32],
) {
    for (i, size) in modules.iter().enumerate() {
        let mut values = base.to_vec();
        values.push((i + 1).to_string());
        lines.push(Line::new(family, values, LineValue::Integer(u64::from(*size))));
    }
}

fn lines(reports: &[TenantReport]) -> Vec<Line> {
    let mut lines = Vec::new();

    for report in reports {
        lines.push(Line::new(
            &TENANT_BAREMETAL_COUNT,
            vec![report.tenant.slug.clone()],
            LineValue::Integer(report.devices.len() as u64),
        ));

        for DeviceReport { device, facts } in &report.devices {
            let base = device_labels(device);

            lines.push(Line::new(
                &BAREMETAL_INFO,
                base.clone(),
                LineValue::Integer(u64::from(facts.generation)),
            ));

            lines.push(Line::new(
                &RAM_TOTAL_GB,
                base.clone(),
                LineValue::Fixed(facts.ram_total_gb),
            ));
            lines.push(Line::new(
                &RAM_MODULE_COUNT,
                base.clone(),
                LineValue::Integer(facts.ram_modules.len() as u64),
            ));
            module_lines(&mut lines, &RAM_MODULE_SIZE_GB, &base, &facts.ram_modules);

            lines.push(Line::new(
                &SSD_TOTAL_GB,
                base.clone(),
                LineValue::Fixed(facts.ssd_total_gb),
            ));
            lines.push(Line::new(
                &SSD_COUNT,
                base.clone(),
                LineValue::Integer(facts.ssd_modules.len() as u64),
            ));
            module_lines(&mut lines, &SSD_MODULE_SIZE_GB, &base, &facts.ssd_modules);
        }
    }

    lines
}

/// Escape a label value for the exposition format (`\`, `"` and newline).
pub fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// The samples a snapshot of `reports` contains, in document order
///
/// Values are exactly what the document states after formatting: totals are
/// rounded to whole gigabytes.
pub fn snapshot_samples(reports: &[TenantReport]) -> Vec<MetricSample> {
    lines(reports)
        .into_iter()
        .map(|line| {
            let mut rendered = String::new();
            line.value.write(&mut rendered);
            let value = rendered.parse().unwrap_or_else(|_| line.value.as_f64());

            MetricSample {
                family_name: line.family.name.to_string(),
                labels: line
                    .family
                    .labels
                    .iter()
                    .map(|name| name.to_string())
                    .zip(line.values)
                    .collect(),
                value,
                kind: ValueKind::Gauge,
            }
        })
        .collect()
}

/// Render the full snapshot document for one fetch cycle.
///
/// Rendering is a pure function of `reports`: identical input yields a
/// byte-identical document.
pub fn render_snapshot(reports: &[TenantReport]) -> String {
    let mut buf = String::new();
    buf.push_str(HEADER);
    buf.push('\n');

    for line in lines(reports) {
        buf.push_str(line.family.name);
        buf.push('{');
        for (i, (name, value)) in line.family.labels.iter().zip(&line.values).enumerate() {
            if i > 0 {
                buf.push(',');
            }
            buf.push_str(name);
            buf.push_str("=\"");
            buf.push_str(&escape_label_value(value));
            buf.push('"');
        }
        buf.push_str("} ");
        line.value.write(&mut buf);
        buf.push('\n');
    }

    buf
}

//! Hardware Fact Extraction
//!
//! Derives per-device hardware facts from NetBox free text: the server generation
//! from the device type's model string, and memory/storage capacity from inventory
//! item names and descriptions.
//!
//! This is a best-effort classifier over operator-entered text. Text that matches
//! nothing yields generation `0` and empty capacity lists; it is never an error.

use crate::netbox::types::InventoryItem;
use once_cell::sync::Lazy;
use regex::Regex;

/// Generation number → model substrings (matched against the lowercased model).
///
/// No pattern may be a substring of a pattern belonging to another generation,
/// so the first match is also the only match.
pub const GENERATION_PATTERNS: &[(u32, &[&str])] = &[
    (9, &["g9", "gen9"]),
    (10, &["g10", "gen10"]),
    (11, &["g11", "gen11"]),
    (12, &["g12", "gen12"]),
];

static CAPACITY_GB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*gb").unwrap_or_else(|_| unreachable!()));

/// Facts derived for one device during one fetch cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardwareFacts {
    /// `0` when the model matched no known generation
    pub generation: u32,
    pub ram_total_gb: f64,
    /// Module sizes in inventory order
    pub ram_modules: Vec<u32>,
    pub ssd_total_gb: f64,
    pub ssd_modules: Vec<u32>,
}

/// Classify a device model into a hardware generation.
///
/// # Examples
///
/// ```
/// use netbox_exporter::facts::detect_generation;
///
/// assert_eq!(detect_generation("ProLiant DL380 Gen10"), 10);
/// assert_eq!(detect_generation("Unknown-Box-X1"), 0);
/// ```
pub fn detect_generation(model: &str) -> u32 {
    let model = model.to_lowercase();

    GENERATION_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| model.contains(p)))
        .map(|(generation, _)| *generation)
        .unwrap_or(0)
}

/// First `<n> gb` capacity in `text`, if any.
fn capacity_gb(text: &str) -> Option<u32> {
    CAPACITY_GB
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Derive hardware facts for a device from its model and inventory items.
///
/// An item counts towards RAM when its text mentions `ram` or `ddr`, and towards
/// SSD storage when it mentions `ssd`. Both checks are independent, so one item may
/// feed both totals.
pub fn extract_facts(model: &str, items: &[InventoryItem]) -> HardwareFacts {
    let mut facts = HardwareFacts {
        generation: detect_generation(model),
        ..HardwareFacts::default()
    };

    for item in items {
        let text = format!("{} {}", item.name, item.description).to_lowercase();

        if text.contains("ram") || text.contains("ddr") {
            if let Some(gb) = capacity_gb(&text) {
                facts.ram_modules.push(gb);
                facts.ram_total_gb += f64::from(gb);
            }
        }

        if text.contains("ssd") {
            if let Some(gb) = capacity_gb(&text) {
                facts.ssd_modules.push(gb);
                facts.ssd_total_gb += f64::from(gb);
            }
        }
    }

    facts
}

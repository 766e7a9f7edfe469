//! Snapshot Collector
//!
//! Custom `prometheus::core::Collector` that re-reads and re-parses the current
//! snapshot on every scrape. Nothing parsed is cached between scrapes; the document
//! in the [`SnapshotStore`] is the only state.
//!
//! Scrapes never wait for a fetch cycle. They see whichever complete snapshot the
//! store holds at that moment, or nothing before the first cycle has finished.

use crate::exposition::{
    family_spec, parse_exposition, Exposition, MetricFamily, ValueKind, SNAPSHOT_FAMILIES,
};
use crate::snapshot::store::SnapshotStore;
use prometheus::core::{Collector, Desc};
use prometheus::proto;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SnapshotCollector {
    store: Arc<SnapshotStore>,
    descs: Vec<Desc>,
}

impl SnapshotCollector {
    pub fn new(store: Arc<SnapshotStore>) -> prometheus::Result<Self> {
        let descs = SNAPSHOT_FAMILIES
            .iter()
            .map(|family| {
                Desc::new(
                    family.name.to_string(),
                    family.help.to_string(),
                    family.labels.iter().map(|l| l.to_string()).collect(),
                    HashMap::new(),
                )
            })
            .collect::<prometheus::Result<Vec<_>>>()?;

        Ok(Self { store, descs })
    }

    /// Parse the current snapshot
    ///
    /// Skipped lines are logged here so both [`families`](Self::families) and the
    /// registry path report them the same way.
    pub fn exposition(&self) -> Exposition {
        let (data, source) = self.store.read_with_source();
        let text = String::from_utf8_lossy(&data);
        let exposition = parse_exposition(&text);

        for error in &exposition.errors {
            debug!("Skipping snapshot line: {}", error);
        }
        if !exposition.errors.is_empty() {
            warn!(
                "Skipped {} malformed line(s) in snapshot read from {:?}",
                exposition.errors.len(),
                source
            );
        }

        exposition
    }

    /// The typed families of the current snapshot
    pub fn families(&self) -> Vec<MetricFamily> {
        self.exposition().families
    }
}

fn help_for(family: &MetricFamily) -> String {
    if !family.help.is_empty() {
        return family.help.clone();
    }
    match family_spec(&family.name) {
        Some(spec) => spec.help.to_string(),
        None => format!("Snapshot metric {}", family.name),
    }
}

/// Convert a parsed family into the protobuf form the registry encodes.
///
/// Untyped families go out as gauges: the text encoder only handles counter,
/// gauge, summary and histogram, and a bare sample carries no more than a gauge
/// value does. The parsed family keeps its `Untyped` kind.
#[allow(deprecated)]
pub fn to_proto(family: &MetricFamily) -> proto::MetricFamily {
    let metrics = family
        .samples
        .iter()
        .map(|sample| {
            let labels = sample
                .labels
                .iter()
                .map(|(name, value)| {
                    let mut lp = proto::LabelPair::default();
                    lp.set_name(name.clone());
                    lp.set_value(value.clone());
                    lp
                })
                .collect();

            let mut m = proto::Metric::default();
            m.set_label(labels);
            match family.kind {
                ValueKind::Counter => {
                    let mut c = proto::Counter::default();
                    c.set_value(sample.value);
                    m.set_counter(c);
                }
                ValueKind::Gauge | ValueKind::Untyped => {
                    let mut g = proto::Gauge::default();
                    g.set_value(sample.value);
                    m.set_gauge(g);
                }
            }
            m
        })
        .collect();

    let mut mf = proto::MetricFamily::default();
    mf.set_name(family.name.clone());
    mf.set_help(help_for(family));
    mf.set_field_type(match family.kind {
        ValueKind::Counter => proto::MetricType::COUNTER,
        ValueKind::Gauge | ValueKind::Untyped => proto::MetricType::GAUGE,
    });
    mf.set_metric(metrics);
    mf
}

impl Collector for SnapshotCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        self.exposition()
            .families
            .iter()
            .filter(|family| !family.samples.is_empty())
            .map(to_proto)
            .collect()
    }
}

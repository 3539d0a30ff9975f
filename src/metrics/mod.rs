pub mod percentiles;
pub mod sink;
pub mod stats;

use serde::Serialize;

pub use sink::{MemorySink, SampleSink};
pub use stats::{ScrapeStats, StatsSnapshot};

/// Leading component of every metric name.
pub const NAMESPACE: &str = "harbor";

/// How a sample's value evolves between scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Counter,
    Gauge,
}

/// One fully-labelled observation, ready for exposition.
/// Workers produce these; sinks and the cache consume them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// e.g. "harbor_replication_status"
    pub metric_name: String,
    /// Parallel to the metric's label schema
    pub label_values: Vec<String>,
    pub value: f64,
    pub kind: ValueKind,
}

/// Static description of a metric: name, help text and label schema.
#[derive(Debug, Clone)]
pub struct MetricDesc {
    pub name: String,
    pub help: &'static str,
    pub kind: ValueKind,
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    pub fn new(
        instance: &str,
        name: &str,
        help: &'static str,
        kind: ValueKind,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name: fq_name(NAMESPACE, instance, name),
            help,
            kind,
            labels,
        }
    }

    pub fn gauge(instance: &str, name: &str, help: &'static str) -> Self {
        Self::new(instance, name, help, ValueKind::Gauge, &[])
    }

    /// Build a sample; `label_values` must line up with `self.labels`.
    pub fn sample(&self, value: f64, label_values: &[&str]) -> Sample {
        debug_assert_eq!(
            label_values.len(),
            self.labels.len(),
            "label arity mismatch for {}",
            self.name
        );
        Sample {
            metric_name: self.name.clone(),
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
            value,
            kind: self.kind,
        }
    }
}

/// Join non-empty name parts with `_`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

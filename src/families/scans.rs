use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::DegradedRunPolicy;
use crate::collect::Family;
use crate::error::Result;
use crate::metrics::{MetricDesc, Sample};
use crate::upstream::{fetch_json, Upstream};

/// Progress of the latest scan-all job. This family has no fan-out:
/// the summary returned by the listing call is the only work item.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanSummary {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub completed: f64,
    #[serde(default)]
    pub requester: String,
}

pub struct Scans {
    upstream: Arc<dyn Upstream>,
    up: MetricDesc,
    requester: MetricDesc,
    total: MetricDesc,
    completed: MetricDesc,
}

impl Scans {
    pub fn new(upstream: Arc<dyn Upstream>, instance: &str) -> Self {
        Self {
            upstream,
            up: MetricDesc::gauge(
                instance,
                "scans_up",
                "Was the last query of harbor scans successful.",
            ),
            requester: MetricDesc::gauge(instance, "scans_requester", "Requester of the latest scan all process."),
            total: MetricDesc::gauge(instance, "scans_total", "Artifacts in the latest scan all process."),
            completed: MetricDesc::gauge(
                instance,
                "scans_completed",
                "Artifacts completed in the latest scan all process.",
            ),
        }
    }
}

#[async_trait]
impl Family for Scans {
    type Item = ScanSummary;

    fn name(&self) -> &str {
        "scans"
    }

    fn up_desc(&self) -> &MetricDesc {
        &self.up
    }

    fn degraded_policy(&self) -> DegradedRunPolicy {
        DegradedRunPolicy::Cache
    }

    async fn list(&self) -> Result<Vec<ScanSummary>> {
        let summary = fetch_json(self.upstream.as_ref(), "/scans/all/metrics").await?;
        Ok(vec![summary])
    }

    async fn process(&self, summary: ScanSummary) -> Result<Vec<Sample>> {
        // Non-numeric requesters (e.g. "Manual") report as 0
        let requester = summary.requester.trim().parse::<f64>().unwrap_or(0.0);
        Ok(vec![
            self.requester.sample(requester, &[]),
            self.total.sample(summary.total, &[]),
            self.completed.sample(summary.completed, &[]),
        ])
    }

    fn describe(&self, _summary: &ScanSummary) -> String {
        "scan-all".to_string()
    }
}

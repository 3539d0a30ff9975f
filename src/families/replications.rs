use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::DegradedRunPolicy;
use crate::collect::Family;
use crate::error::Result;
use crate::metrics::{MetricDesc, Sample, ValueKind};
use crate::upstream::{fetch_all_json, fetch_json, Upstream};

/// One replication policy from the listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    pub id: i64,
    pub name: String,
}

/// Latest execution of a policy. Fields not needed for metrics are ignored.
#[derive(Debug, Deserialize)]
struct Execution {
    #[serde(default)]
    status: String,
    #[serde(default)]
    failed: f64,
    #[serde(default)]
    succeed: f64,
    #[serde(default)]
    in_progress: f64,
    #[serde(default)]
    stopped: f64,
}

/// Status of the latest execution of every replication policy.
/// Fans out one executions lookup per policy.
pub struct Replications {
    upstream: Arc<dyn Upstream>,
    up: MetricDesc,
    status: MetricDesc,
    tasks: MetricDesc,
}

impl Replications {
    pub fn new(upstream: Arc<dyn Upstream>, instance: &str) -> Self {
        Self {
            upstream,
            up: MetricDesc::gauge(
                instance,
                "replication_up",
                "Was the last query of harbor replications successful.",
            ),
            status: MetricDesc::new(
                instance,
                "replication_status",
                "Status of the last execution of this replication policy: Succeed = 1, any other status = 0.",
                ValueKind::Gauge,
                &["repl_pol_name"],
            ),
            tasks: MetricDesc::new(
                instance,
                "replication_tasks",
                "Number of replication tasks, by result, in the latest execution of this replication policy.",
                ValueKind::Gauge,
                &["repl_pol_name", "result"],
            ),
        }
    }

    fn samples_for(&self, policy: &str, executions: &[Execution]) -> Vec<Sample> {
        let mut out = Vec::with_capacity(executions.len() * 5);
        for exec in executions {
            let status = if exec.status == "Succeed" { 1.0 } else { 0.0 };
            out.push(self.status.sample(status, &[policy]));
            out.push(self.tasks.sample(exec.failed, &[policy, "failed"]));
            out.push(self.tasks.sample(exec.succeed, &[policy, "succeed"]));
            out.push(self.tasks.sample(exec.in_progress, &[policy, "in_progress"]));
            out.push(self.tasks.sample(exec.stopped, &[policy, "stopped"]));
        }
        out
    }
}

#[async_trait]
impl Family for Replications {
    type Item = Policy;

    fn name(&self) -> &str {
        "replications"
    }

    fn up_desc(&self) -> &MetricDesc {
        &self.up
    }

    fn degraded_policy(&self) -> DegradedRunPolicy {
        DegradedRunPolicy::KeepPrevious
    }

    async fn list(&self) -> Result<Vec<Policy>> {
        fetch_all_json(self.upstream.as_ref(), "/replication/policies").await
    }

    async fn process(&self, policy: Policy) -> Result<Vec<Sample>> {
        let path = format!(
            "/replication/executions?policy_id={}&page=1&page_size=1",
            policy.id
        );
        let executions: Vec<Execution> = fetch_json(self.upstream.as_ref(), &path).await?;
        Ok(self.samples_for(&policy.name, &executions))
    }

    fn describe(&self, policy: &Policy) -> String {
        format!("policy {} ({})", policy.id, policy.name)
    }
}

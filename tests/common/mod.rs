#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use harbor_scrape::{CollectError, Result, Sample, Upstream};
use parking_lot::Mutex;
use serde_json::{json, Value};

enum Reply {
    Body(String),
    Fail,
}

/// In-memory upstream keyed by exact request path.
pub struct FakeUpstream {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with(self, path: &str, body: Value) -> Self {
        self.set(path, body);
        self
    }

    pub fn failing(self, path: &str) -> Self {
        self.routes.lock().insert(path.to_string(), Reply::Fail);
        self
    }

    pub fn set(&self, path: &str, body: Value) {
        self.routes
            .lock()
            .insert(path.to_string(), Reply::Body(body.to_string()));
    }

    pub fn set_raw(&self, path: &str, body: &str) {
        self.routes
            .lock()
            .insert(path.to_string(), Reply::Body(body.to_string()));
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|p| p.as_str() == path).count()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.calls.lock().push(path.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.routes.lock().get(path) {
            Some(Reply::Body(body)) => Ok(body.clone().into_bytes()),
            Some(Reply::Fail) => Err(CollectError::Upstream(format!("{path} unavailable"))),
            None => Err(CollectError::Status {
                path: path.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn executions_path(policy_id: i64) -> String {
    format!("/replication/executions?policy_id={policy_id}&page=1&page_size=1")
}

pub fn execution(status: &str, failed: u32, succeed: u32) -> Value {
    json!([{
        "id": 99,
        "status": status,
        "failed": failed,
        "succeed": succeed,
        "in_progress": 0,
        "stopped": 0,
        "trigger": "scheduled"
    }])
}

/// Upstream with policies A(1), B(2), C(3); all executions succeed.
pub fn replication_upstream() -> FakeUpstream {
    FakeUpstream::new()
        .with(
            "/replication/policies",
            json!([
                {"id": 1, "name": "A"},
                {"id": 2, "name": "B"},
                {"id": 3, "name": "C"}
            ]),
        )
        .with(&executions_path(1), execution("Succeed", 0, 4))
        .with(&executions_path(2), execution("Succeed", 0, 2))
        .with(&executions_path(3), execution("Failed", 1, 3))
}

/// Order-independent view of a sample set.
pub fn sorted(mut samples: Vec<Sample>) -> Vec<Sample> {
    samples.sort_by(|a, b| {
        (&a.metric_name, &a.label_values).cmp(&(&b.metric_name, &b.label_values))
    });
    samples
}

/// Drop the family health gauge, keeping only data samples.
pub fn data_only(samples: Vec<Sample>, up_name: &str) -> Vec<Sample> {
    samples
        .into_iter()
        .filter(|s| s.metric_name != up_name)
        .collect()
}

pub fn up_value(samples: &[Sample], up_name: &str) -> Option<f64> {
    samples
        .iter()
        .find(|s| s.metric_name == up_name)
        .map(|s| s.value)
}

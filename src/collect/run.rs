use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::pool::{self, ItemProcessor};
use super::queue::WorkQueue;
use crate::cache::DegradedRunPolicy;
use crate::error::{CollectError, Result};
use crate::metrics::{MetricDesc, Sample, SampleSink};

/// One metric family: how to list its work items and how to turn each
/// item into samples.
#[async_trait]
pub trait Family: Send + Sync + 'static {
    type Item: Send + 'static;

    /// Stable identifier used in logs, e.g. "replications".
    fn name(&self) -> &str;

    /// Descriptor of the `<family>_up` health gauge.
    fn up_desc(&self) -> &MetricDesc;

    /// Whether a run with failed items may seed the cache.
    fn degraded_policy(&self) -> DegradedRunPolicy;

    /// Initial listing call. A failure aborts the run before any worker starts.
    async fn list(&self) -> Result<Vec<Self::Item>>;

    /// Expand one item into samples.
    async fn process(&self, item: Self::Item) -> Result<Vec<Sample>>;

    fn describe(&self, item: &Self::Item) -> String;
}

/// Result of one collection run.
#[derive(Debug)]
pub struct RunOutcome {
    pub ok: bool,
    pub listed: usize,
    pub completed: usize,
    pub errors: Vec<CollectError>,
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Health gauge value for this outcome.
    pub fn up_value(&self) -> f64 {
        if self.ok {
            1.0
        } else {
            0.0
        }
    }
}

/// Adapts a family to the pool's per-item seam.
struct FamilyProcessor<F>(Arc<F>);

#[async_trait]
impl<F: Family> ItemProcessor<F::Item> for FamilyProcessor<F> {
    async fn process(&self, item: F::Item) -> Result<Vec<Sample>> {
        self.0.process(item).await
    }

    fn describe(&self, item: &F::Item) -> String {
        self.0.describe(item)
    }
}

/// One full refresh of a metric family: list, fan out, join.
pub struct CollectionRun<F: Family> {
    family: Arc<F>,
    threads: usize,
}

impl<F: Family> CollectionRun<F> {
    pub fn new(family: Arc<F>, threads: usize) -> Self {
        Self {
            family,
            threads: threads.max(1),
        }
    }

    /// Produce every data sample of the family into `sink`.
    ///
    /// Emitting the health gauge and publishing the up-signal is left to the
    /// caller, which also has to do it for cache replays.
    pub async fn execute(&self, sink: Arc<dyn SampleSink>) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "collection_run",
            family = self.family.name(),
            %run_id,
            threads = self.threads
        );
        self.execute_inner(sink).instrument(span).await
    }

    async fn execute_inner(&self, sink: Arc<dyn SampleSink>) -> RunOutcome {
        let started = Instant::now();

        // ── 1. Listing ──────────────────────────────────────────
        let items = match self.family.list().await {
            Ok(items) => items,
            Err(source) => {
                let err = CollectError::listing(self.family.name(), source);
                error!(error = %err, "listing failed, no workers started");
                return RunOutcome {
                    ok: false,
                    listed: 0,
                    completed: 0,
                    errors: vec![err],
                    elapsed: started.elapsed(),
                };
            }
        };

        let listed = items.len();
        if listed == 0 {
            debug!("empty listing");
            return RunOutcome {
                ok: true,
                listed: 0,
                completed: 0,
                errors: Vec::new(),
                elapsed: started.elapsed(),
            };
        }

        // ── 2. Fill queue, 3. fan out, 4. join ──────────────────
        let queue = Arc::new(WorkQueue::new(items));
        let processor = Arc::new(FamilyProcessor(self.family.clone()));
        let report = pool::run(queue, self.threads, processor, sink).await;

        let outcome = RunOutcome {
            ok: report.is_clean(),
            listed,
            completed: report.completed,
            errors: report.errors,
            elapsed: started.elapsed(),
        };

        if outcome.ok {
            info!(
                listed,
                completed = outcome.completed,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "collection run finished"
            );
        } else {
            warn!(
                listed,
                completed = outcome.completed,
                failed = outcome.errors.len(),
                "collection run degraded"
            );
        }
        outcome
    }
}

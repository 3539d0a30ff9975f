use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::queue::WorkQueue;
use crate::error::{CollectError, Result};
use crate::metrics::{Sample, SampleSink};

/// Per-item work performed by the pool.
#[async_trait]
pub trait ItemProcessor<T: Send + 'static>: Send + Sync + 'static {
    /// Fetch and parse one item into samples, in a fixed field order.
    async fn process(&self, item: T) -> Result<Vec<Sample>>;

    /// Short human-readable label used in logs and errors.
    fn describe(&self, item: &T) -> String;
}

/// What one pool invocation achieved.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Items whose samples were all emitted
    pub completed: usize,
    /// One entry per failed item or crashed worker
    pub errors: Vec<CollectError>,
    /// Total worker tasks started, replacements included
    pub workers_started: usize,
}

impl PoolReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

enum WorkerExit {
    Drained,
    Failed(CollectError),
}

// ─── Public entry point ──────────────────────────────────────────

/// Drain `queue` with at most `threads` concurrent workers.
///
/// A worker whose item fails retires; if items remain, the pool starts a
/// fresh worker in its place so the queue is always drained and the
/// concurrency bound is never exceeded. Returns once every worker retired.
pub async fn run<T, P>(
    queue: Arc<WorkQueue<T>>,
    threads: usize,
    processor: Arc<P>,
    sink: Arc<dyn SampleSink>,
) -> PoolReport
where
    T: Send + 'static,
    P: ItemProcessor<T> + ?Sized,
{
    let completed = Arc::new(AtomicUsize::new(0));
    let mut report = PoolReport::default();
    let mut workers = JoinSet::new();

    // No point starting more workers than there are items
    let initial = threads.max(1).min(queue.remaining());
    for _ in 0..initial {
        let id = report.workers_started;
        workers.spawn(worker(
            id,
            queue.clone(),
            processor.clone(),
            sink.clone(),
            completed.clone(),
        ));
        report.workers_started += 1;
    }

    while let Some(joined) = workers.join_next().await {
        let failure = match joined {
            Ok(WorkerExit::Drained) => None,
            Ok(WorkerExit::Failed(err)) => Some(err),
            Err(join_err) => {
                warn!(error = %join_err, "worker task crashed");
                Some(CollectError::Worker(join_err.to_string()))
            }
        };

        let Some(err) = failure else { continue };
        report.errors.push(err);

        if !queue.is_empty() {
            let id = report.workers_started;
            debug!(worker = id, remaining = queue.remaining(), "starting replacement worker");
            workers.spawn(worker(
                id,
                queue.clone(),
                processor.clone(),
                sink.clone(),
                completed.clone(),
            ));
            report.workers_started += 1;
        }
    }

    report.completed = completed.load(Ordering::SeqCst);
    report
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker<T, P>(
    id: usize,
    queue: Arc<WorkQueue<T>>,
    processor: Arc<P>,
    sink: Arc<dyn SampleSink>,
    completed: Arc<AtomicUsize>,
) -> WorkerExit
where
    T: Send + 'static,
    P: ItemProcessor<T> + ?Sized,
{
    for item in queue.drain() {
        let label = processor.describe(&item);
        match processor.process(item).await {
            Ok(samples) => {
                for sample in samples {
                    sink.emit(sample);
                }
                completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(source) => {
                warn!(worker = id, item = %label, error = %source, "item failed, worker retiring");
                return WorkerExit::Failed(CollectError::item(label, source));
            }
        }
    }
    WorkerExit::Drained
}

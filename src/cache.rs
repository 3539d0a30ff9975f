//! Write-through TTL cache for one metric family.
//!
//! A scrape first asks [`TtlCache::try_replay`]. On a miss the collection run
//! writes through the sink returned by [`TtlCache::tee`], which forwards every
//! sample and keeps a copy; the returned [`CacheCommit`] then swaps the copy
//! in as the new entry.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::collect::RunOutcome;
use crate::metrics::{Sample, SampleSink};

/// What to do with the samples of a run that finished with failed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedRunPolicy {
    /// Store them anyway: best available snapshot.
    Cache,
    /// Leave the previous entry untouched.
    KeepPrevious,
}

struct CacheEntry {
    created_at: Instant,
    ttl: Duration,
    samples: Arc<[Sample]>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

pub struct TtlCache {
    family: String,
    enabled: bool,
    ttl: Duration,
    policy: DegradedRunPolicy,
    entry: Mutex<Option<CacheEntry>>,
    /// Serializes replay-or-compute decisions for this family only
    refresh: tokio::sync::Mutex<()>,
}

impl TtlCache {
    pub fn new(
        family: impl Into<String>,
        enabled: bool,
        ttl: Duration,
        policy: DegradedRunPolicy,
    ) -> Self {
        Self {
            family: family.into(),
            enabled,
            ttl,
            policy,
            entry: Mutex::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.ttl.is_zero()
    }

    /// Hold this guard across replay-or-compute so overlapping scrapes of the
    /// same family wait for the first one and then replay its result.
    /// Returns `None` when caching is off; nothing needs serializing then.
    pub async fn lock_refresh(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        if self.is_enabled() {
            Some(self.refresh.lock().await)
        } else {
            None
        }
    }

    /// Write the cached samples to `sink` if a fresh, non-empty entry exists.
    pub fn try_replay(&self, sink: &dyn SampleSink) -> bool {
        if !self.is_enabled() {
            return false;
        }

        // Clone the Arc under the lock, emit outside it
        let samples = {
            let guard = self.entry.lock();
            match guard.as_ref() {
                Some(entry)
                    if !entry.samples.is_empty() && entry.is_fresh(Instant::now()) =>
                {
                    entry.samples.clone()
                }
                _ => return false,
            }
        };

        for sample in samples.iter() {
            sink.emit(sample.clone());
        }
        debug!(family = %self.family, samples = samples.len(), "replayed cached samples");
        true
    }

    /// Wrap `sink` so everything written to it is also kept for the cache.
    pub fn tee(&self, sink: Arc<dyn SampleSink>) -> (Arc<CachingSink>, CacheCommit<'_>) {
        let tee = Arc::new(CachingSink {
            inner: sink,
            buffer: Mutex::new(Vec::new()),
        });
        let commit = CacheCommit {
            cache: self,
            tee: tee.clone(),
        };
        (tee, commit)
    }

    /// Number of samples in the current entry, fresh or not.
    pub fn cached_len(&self) -> usize {
        self.entry.lock().as_ref().map_or(0, |e| e.samples.len())
    }

    fn replace(&self, samples: Vec<Sample>) {
        let entry = CacheEntry {
            created_at: Instant::now(),
            ttl: self.ttl,
            samples: samples.into(),
        };
        *self.entry.lock() = Some(entry);
    }
}

/// Decorator sink: forwards to the real sink and accumulates a copy.
pub struct CachingSink {
    inner: Arc<dyn SampleSink>,
    buffer: Mutex<Vec<Sample>>,
}

impl SampleSink for CachingSink {
    fn emit(&self, sample: Sample) {
        self.buffer.lock().push(sample.clone());
        self.inner.emit(sample);
    }
}

/// Finishes a write-through: consumed exactly once after the run.
#[must_use = "the run's samples are only cached once the commit is finished"]
pub struct CacheCommit<'a> {
    cache: &'a TtlCache,
    tee: Arc<CachingSink>,
}

impl CacheCommit<'_> {
    /// Replace the entry with the accumulated samples, unless the run was
    /// degraded and the family keeps its previous entry. Returns whether the
    /// entry was replaced.
    pub fn finish(self, outcome: &RunOutcome) -> bool {
        if !outcome.ok && self.cache.policy == DegradedRunPolicy::KeepPrevious {
            debug!(family = %self.cache.family, "degraded run, keeping previous cache entry");
            return false;
        }

        let samples = std::mem::take(&mut *self.tee.buffer.lock());
        debug!(
            family = %self.cache.family,
            samples = samples.len(),
            degraded = !outcome.ok,
            "cache entry replaced"
        );
        self.cache.replace(samples);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MemorySink, MetricDesc};

    fn samples(values: &[f64]) -> Vec<Sample> {
        let desc = MetricDesc::gauge("", "value", "test");
        values.iter().map(|v| desc.sample(*v, &[])).collect()
    }

    fn outcome(ok: bool) -> RunOutcome {
        RunOutcome {
            ok,
            listed: 0,
            completed: 0,
            errors: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn cache(policy: DegradedRunPolicy) -> TtlCache {
        TtlCache::new("test", true, Duration::from_secs(30), policy)
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_replayed() {
        let cache = cache(DegradedRunPolicy::KeepPrevious);
        cache.replace(samples(&[1.0, 2.0]));

        let sink = MemorySink::new();
        assert!(cache.try_replay(&sink));
        assert_eq!(sink.snapshot(), samples(&[1.0, 2.0]));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_at_ttl() {
        let cache = cache(DegradedRunPolicy::KeepPrevious);
        cache.replace(samples(&[1.0]));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.try_replay(&MemorySink::new()));

        tokio::time::advance(Duration::from_secs(1)).await;
        let sink = MemorySink::new();
        assert!(!cache.try_replay(&sink));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn disabled_or_zero_ttl_never_replays() {
        let off = TtlCache::new("t", false, Duration::from_secs(30), DegradedRunPolicy::Cache);
        off.replace(samples(&[1.0]));
        assert!(!off.try_replay(&MemorySink::new()));
        assert!(off.lock_refresh().await.is_none());

        let zero = TtlCache::new("t", true, Duration::ZERO, DegradedRunPolicy::Cache);
        zero.replace(samples(&[1.0]));
        assert!(!zero.try_replay(&MemorySink::new()));
    }

    #[test]
    fn empty_entry_is_not_replayed() {
        let cache = cache(DegradedRunPolicy::Cache);
        cache.replace(Vec::new());
        assert!(!cache.try_replay(&MemorySink::new()));
    }

    #[test]
    fn tee_forwards_and_commit_stores() {
        let cache = cache(DegradedRunPolicy::KeepPrevious);
        let sink = Arc::new(MemorySink::new());

        let (tee, commit) = cache.tee(sink.clone());
        for s in samples(&[3.0, 4.0]) {
            tee.emit(s);
        }
        assert_eq!(sink.len(), 2);
        assert_eq!(cache.cached_len(), 0);

        assert!(commit.finish(&outcome(true)));
        assert_eq!(cache.cached_len(), 2);

        let replay = MemorySink::new();
        assert!(cache.try_replay(&replay));
        assert_eq!(replay.snapshot(), sink.snapshot());
    }

    #[test]
    fn keep_previous_ignores_degraded_run() {
        let cache = cache(DegradedRunPolicy::KeepPrevious);
        cache.replace(samples(&[1.0]));

        let (tee, commit) = cache.tee(Arc::new(MemorySink::new()));
        tee.emit(samples(&[9.0]).remove(0));
        assert!(!commit.finish(&outcome(false)));

        let replay = MemorySink::new();
        assert!(cache.try_replay(&replay));
        assert_eq!(replay.snapshot(), samples(&[1.0]));
    }

    #[test]
    fn cache_policy_stores_degraded_run() {
        let cache = cache(DegradedRunPolicy::Cache);
        cache.replace(samples(&[1.0]));

        let (tee, commit) = cache.tee(Arc::new(MemorySink::new()));
        tee.emit(samples(&[9.0]).remove(0));
        assert!(commit.finish(&outcome(false)));

        let replay = MemorySink::new();
        assert!(cache.try_replay(&replay));
        assert_eq!(replay.snapshot(), samples(&[9.0]));
    }
}

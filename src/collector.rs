use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::TtlCache;
use crate::collect::{CollectionRun, Family, RunOutcome};
use crate::config::CollectConfig;
use crate::metrics::SampleSink;
use crate::up::UpSignal;

/// Anything the exporter can scrape: one family behind its cache.
#[async_trait]
pub trait Scrape: Send + Sync {
    fn family(&self) -> &str;

    /// Emit the family's samples plus its health gauge into `sink` and
    /// publish the up-signal. Returns the published value.
    async fn scrape(&self, sink: Arc<dyn SampleSink>) -> bool;
}

/// A metric family wired to its own cache and up-signal.
pub struct FamilyCollector<F: Family> {
    family: Arc<F>,
    threads: usize,
    cache: TtlCache,
    up: UpSignal,
}

impl<F: Family> FamilyCollector<F> {
    pub fn new(family: F, config: &CollectConfig, up: UpSignal) -> Self {
        let cache = TtlCache::new(
            family.name(),
            config.cache_enabled,
            config.cache_duration(),
            family.degraded_policy(),
        );
        Self::with_cache(family, config.threads, cache, up)
    }

    pub fn with_cache(family: F, threads: usize, cache: TtlCache, up: UpSignal) -> Self {
        Self {
            family: Arc::new(family),
            threads,
            cache,
            up,
        }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Run the family fresh, writing through the cache when it is enabled.
    async fn refresh(&self, sink: Arc<dyn SampleSink>) -> RunOutcome {
        let run = CollectionRun::new(self.family.clone(), self.threads);
        if !self.cache.is_enabled() {
            return run.execute(sink).await;
        }

        let (tee, commit) = self.cache.tee(sink);
        let outcome = run.execute(tee).await;
        commit.finish(&outcome);
        outcome
    }
}

#[async_trait]
impl<F: Family> Scrape for FamilyCollector<F> {
    fn family(&self) -> &str {
        self.family.name()
    }

    async fn scrape(&self, sink: Arc<dyn SampleSink>) -> bool {
        let up_desc = self.family.up_desc();
        let _refresh = self.cache.lock_refresh().await;

        if self.cache.try_replay(sink.as_ref()) {
            debug!(family = self.family.name(), "served from cache");
            sink.emit(up_desc.sample(1.0, &[]));
            self.up.publish(true);
            return true;
        }

        let outcome = self.refresh(sink.clone()).await;
        sink.emit(up_desc.sample(outcome.up_value(), &[]));
        self.up.publish(outcome.ok);
        outcome.ok
    }
}

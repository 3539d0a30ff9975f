use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::collect::Family;
use crate::collector::{FamilyCollector, Scrape};
use crate::config::CollectConfig;
use crate::metrics::{MemorySink, MetricDesc, Sample, SampleSink, ScrapeStats, StatsSnapshot};
use crate::up::{up_channel, Readiness};

#[derive(Debug, Clone, Serialize)]
pub struct FamilyStatus {
    pub family: String,
    pub up: bool,
}

/// Everything one scrape produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub collected_at: DateTime<Utc>,
    pub up: bool,
    pub duration_ms: f64,
    pub families: Vec<FamilyStatus>,
    pub samples: Vec<Sample>,
}

/// Scrapes every registered family concurrently and folds their health
/// into a single `harbor_up` gauge.
pub struct Exporter {
    collectors: Vec<Arc<dyn Scrape>>,
    up: MetricDesc,
    readiness: Readiness,
    stats: ScrapeStats,
}

impl Exporter {
    pub fn new(instance: &str) -> Self {
        Self {
            collectors: Vec::new(),
            up: MetricDesc::gauge(instance, "up", "Was the last scrape of Harbor successful."),
            readiness: Readiness::new(),
            stats: ScrapeStats::new(),
        }
    }

    /// Wire `family` to its own cache and up-signal and register it.
    pub fn add_family<F: Family>(&mut self, family: F, config: &CollectConfig) -> &mut Self {
        let (signal, rx) = up_channel(family.name());
        self.readiness.register(rx);
        self.collectors
            .push(Arc::new(FamilyCollector::new(family, config, signal)));
        self
    }

    pub fn families(&self) -> Vec<String> {
        self.collectors.iter().map(|c| c.family().to_string()).collect()
    }

    pub async fn scrape(&self) -> ScrapeReport {
        let started = Instant::now();
        let sink = Arc::new(MemorySink::new());

        let mut handles = Vec::with_capacity(self.collectors.len());
        for collector in &self.collectors {
            let collector = collector.clone();
            let sink: Arc<dyn SampleSink> = sink.clone();
            let family = collector.family().to_string();
            handles.push((
                family,
                tokio::spawn(async move { collector.scrape(sink).await }),
            ));
        }

        let mut families = Vec::with_capacity(handles.len());
        for (family, handle) in handles {
            let up = match handle.await {
                Ok(up) => up,
                Err(e) => {
                    error!(family = %family, error = %e, "scrape task crashed");
                    false
                }
            };
            families.push(FamilyStatus { family, up });
        }

        let up = families.iter().all(|f| f.up);
        sink.emit(self.up.sample(if up { 1.0 } else { 0.0 }, &[]));

        let elapsed = started.elapsed();
        self.stats.record(elapsed, up);
        info!(
            up,
            families = families.len(),
            samples = sink.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "scrape finished"
        );

        ScrapeReport {
            collected_at: Utc::now(),
            up,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            families,
            samples: sink.drain(),
        }
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

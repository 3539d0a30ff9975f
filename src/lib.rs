//! Concurrent collection and caching engine for Harbor registry metrics.
//!
//! A scrape of one metric family goes through its [`TtlCache`]: a fresh
//! entry is replayed, otherwise a [`CollectionRun`] lists the family's work
//! items, drains them with a bounded worker pool and writes every sample
//! through the cache into the caller's [`SampleSink`]. Each scrape ends with
//! a `<family>_up` gauge and an [`UpSignal`] for readiness reporting.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use harbor_scrape::{
//!     CollectConfig, Exporter, HarborClient, HarborConfig,
//!     families::{Replications, Repositories, Scans},
//!     upstream::Upstream,
//! };
//!
//! # async fn demo() -> harbor_scrape::Result<()> {
//! let client: Arc<dyn Upstream> =
//!     Arc::new(HarborClient::new(&HarborConfig::new("https://harbor.local"))?);
//! let config = CollectConfig { cache_enabled: true, ..CollectConfig::default() };
//!
//! let mut exporter = Exporter::new("");
//! exporter
//!     .add_family(Replications::new(client.clone(), ""), &config)
//!     .add_family(Repositories::new(client.clone(), ""), &config)
//!     .add_family(Scans::new(client, ""), &config);
//!
//! let report = exporter.scrape().await;
//! println!("up={} samples={}", report.up, report.samples.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod collect;
pub mod collector;
pub mod config;
pub mod error;
pub mod exporter;
pub mod families;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod up;
pub mod upstream;

pub use cache::{CacheCommit, CachingSink, DegradedRunPolicy, TtlCache};
pub use collect::{CollectionRun, Family, RunOutcome, WorkQueue};
pub use collector::{FamilyCollector, Scrape};
pub use config::{ApiVersion, CollectConfig, HarborConfig};
pub use error::{CollectError, Result};
pub use exporter::{Exporter, ScrapeReport};
pub use metrics::{MemorySink, MetricDesc, Sample, SampleSink, ValueKind};
pub use up::{up_channel, Readiness, UpReceiver, UpSignal};
pub use upstream::{HarborClient, Upstream};

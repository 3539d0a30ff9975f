use std::time::Duration;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::PercentileSet;

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 10 min, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 600_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Self-monitoring for the exporter: how long scrapes take and how
/// often they come back degraded.
pub struct ScrapeStats {
    inner: Mutex<Inner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub duration_us: PercentileSet,
    pub total_scrapes: u64,
    pub failed_scrapes: u64,
    pub last_scrape_at: Option<DateTime<Utc>>,
    pub last_scrape_up: Option<bool>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    duration_hist: Histogram<u64>,
    total_scrapes: u64,
    failed_scrapes: u64,
    last_scrape_at: Option<DateTime<Utc>>,
    last_scrape_up: Option<bool>,
}

impl ScrapeStats {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Record one finished scrape.
    pub fn record(&self, elapsed: Duration, up: bool) {
        let mut inner = self.inner.lock();
        inner.total_scrapes += 1;
        if !up {
            inner.failed_scrapes += 1;
        }
        // Clamp to ≥ 1 μs and saturate at the top of the range
        let us = (elapsed.as_micros() as u64).clamp(HIST_LOW, HIST_HIGH);
        let _ = inner.duration_hist.record(us);
        inner.last_scrape_at = Some(Utc::now());
        inner.last_scrape_up = Some(up);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        StatsSnapshot {
            duration_us: PercentileSet::from_histogram(&inner.duration_hist),
            total_scrapes: inner.total_scrapes,
            failed_scrapes: inner.failed_scrapes,
            last_scrape_at: inner.last_scrape_at,
            last_scrape_up: inner.last_scrape_up,
        }
    }
}

impl Default for ScrapeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn new() -> Self {
        Self {
            duration_hist: Histogram::<u64>::new_with_bounds(
                HIST_LOW,
                HIST_HIGH,
                HIST_SIGFIG,
            )
            .expect("histogram creation"),
            total_scrapes: 0,
            failed_scrapes: 0,
            last_scrape_at: None,
            last_scrape_up: None,
        }
    }
}

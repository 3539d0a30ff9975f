//! Up-signal: the boolean health outcome of each scrape, one slot per family.
//!
//! Publishing overwrites the slot and never blocks, so a slow or missing
//! consumer cannot wedge a collection run.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

/// Create a linked signal/receiver pair for one family.
pub fn up_channel(family: impl Into<String>) -> (UpSignal, UpReceiver) {
    let family: Arc<str> = Arc::from(family.into());
    let (tx, rx) = watch::channel(None);
    (UpSignal { tx }, UpReceiver { family, rx })
}

/// Producer side, owned by the family's collector.
#[derive(Debug)]
pub struct UpSignal {
    tx: watch::Sender<Option<bool>>,
}

impl UpSignal {
    pub fn publish(&self, up: bool) {
        self.tx.send_replace(Some(up));
    }
}

/// Consumer side, owned by a readiness reporter.
#[derive(Debug)]
pub struct UpReceiver {
    family: Arc<str>,
    rx: watch::Receiver<Option<bool>>,
}

impl UpReceiver {
    /// The value published since the last `take`, consumed exactly once.
    /// A value published just before the collector went away is still
    /// handed out.
    pub fn take(&mut self) -> Option<bool> {
        let value = self.rx.borrow_and_update();
        if value.has_changed() {
            *value
        } else {
            None
        }
    }

    /// Latest published value without consuming it.
    pub fn latest(&self) -> Option<bool> {
        *self.rx.borrow()
    }

    pub fn family(&self) -> &str {
        &self.family
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyHealth {
    pub family: String,
    /// Last known outcome; `None` until the family has been scraped
    pub up: Option<bool>,
    /// Whether `up` was published since the previous poll
    pub fresh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub families: Vec<FamilyHealth>,
}

/// Aggregates the up-signals of every family into one readiness verdict.
#[derive(Debug, Default)]
pub struct Readiness {
    slots: Mutex<Vec<Slot>>,
}

#[derive(Debug)]
struct Slot {
    rx: UpReceiver,
    last: Option<bool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, rx: UpReceiver) {
        self.slots.lock().push(Slot { rx, last: None });
    }

    /// Drain every family's slot once. Ready means every family has reported
    /// and its last outcome was healthy.
    pub fn poll(&self) -> ReadinessReport {
        let mut slots = self.slots.lock();
        let families: Vec<FamilyHealth> = slots
            .iter_mut()
            .map(|slot| {
                let taken = slot.rx.take();
                if taken.is_some() {
                    slot.last = taken;
                }
                FamilyHealth {
                    family: slot.rx.family().to_string(),
                    up: slot.last,
                    fresh: taken.is_some(),
                }
            })
            .collect();

        let ready = !families.is_empty() && families.iter().all(|f| f.up == Some(true));
        ReadinessReport { ready, families }
    }
}

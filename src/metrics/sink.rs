use parking_lot::Mutex;

use super::Sample;

/// Destination for samples. Workers of one run write concurrently,
/// so implementations must be thread-safe.
pub trait SampleSink: Send + Sync {
    fn emit(&self, sample: Sample);
}

/// Direct sink that keeps every sample in memory.
/// The exporter hands one to each scrape and reads it back afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Mutex<Vec<Sample>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Copy of everything emitted so far.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    /// Take everything emitted so far, leaving the sink empty.
    pub fn drain(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.samples.lock())
    }
}

impl SampleSink for MemorySink {
    fn emit(&self, sample: Sample) {
        self.samples.lock().push(sample);
    }
}

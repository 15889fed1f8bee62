//! In-process recorder that keeps everything it is given.
//!
//! Used by tests and diagnostics to inspect what the aggregator reported.

use super::{EventKind, MetricsSink, SourceId, UkmEntry};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Recorded {
    entries: Vec<UkmEntry>,
    histograms: HashMap<String, Vec<i64>>,
}

/// Thread-safe recorder of entries and histogram samples.
#[derive(Default)]
pub struct MemoryRecorder {
    inner: Mutex<Recorded>,
}

impl MemoryRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries recorded
    pub fn entries_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Number of distinct sources with at least one entry
    pub fn sources_count(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .map(|entry| entry.source_id)
            .collect::<HashSet<SourceId>>()
            .len()
    }

    /// All entries, in emission order
    pub fn entries(&self) -> Vec<UkmEntry> {
        self.inner.lock().entries.clone()
    }

    /// Entries of one kind, in emission order
    pub fn entries_by_kind(&self, event: EventKind) -> Vec<UkmEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.event == event)
            .cloned()
            .collect()
    }

    /// Samples recorded for a histogram
    pub fn histogram_samples(&self, name: &str) -> Vec<i64> {
        self.inner
            .lock()
            .histograms
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of samples recorded for a histogram
    pub fn histogram_count(&self, name: &str) -> usize {
        self.inner.lock().histograms.get(name).map_or(0, Vec::len)
    }

    /// Sum of samples recorded for a histogram
    pub fn histogram_sum(&self, name: &str) -> i64 {
        self.inner
            .lock()
            .histograms
            .get(name)
            .map_or(0, |samples| samples.iter().sum())
    }

    /// How often `value` was recorded for a histogram
    pub fn bucket_count(&self, name: &str, value: i64) -> usize {
        self.inner
            .lock()
            .histograms
            .get(name)
            .map_or(0, |samples| samples.iter().filter(|&&s| s == value).count())
    }

    /// Forget everything
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.histograms.clear();
    }
}

impl MetricsSink for MemoryRecorder {
    fn record_entry(&self, entry: UkmEntry) {
        self.inner.lock().entries.push(entry);
    }

    fn record_histogram(&self, name: &str, sample: i64) {
        let mut inner = self.inner.lock();
        match inner.histograms.get_mut(name) {
            Some(samples) => samples.push(sample),
            None => {
                inner.histograms.insert(name.to_string(), vec![sample]);
            },
        }
    }
}

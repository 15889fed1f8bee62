//! Host-facing metrics pipeline.
//!
//! The aggregator emits two kinds of output:
//! - keyed events ([`UkmEntry`]) tied to a source, one per report
//! - cumulative histogram samples, identified by name
//!
//! Both go through a [`MetricsSink`]. Writes are fire-and-forget; a sink that
//! cannot accept a record drops it.

pub mod channel;
pub mod memory;

pub use channel::{ChannelSink, SinkRecord};
pub use memory::MemoryRecorder;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the page/frame the events describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub i64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of keyed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Periodic per-frame sample
    UpdateTime,
    /// One-time aggregate up to first contentful paint
    PageLoad,
}

impl EventKind {
    /// Event name as seen by the metrics pipeline
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::UpdateTime => "Blink.UpdateTime",
            EventKind::PageLoad => "Blink.PageLoad",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named value within an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetric {
    /// Field name
    pub name: String,
    /// Field value
    pub value: i64,
}

/// A keyed event with its metric fields, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UkmEntry {
    /// Event kind
    pub event: EventKind,
    /// Source the entry belongs to
    pub source_id: SourceId,
    /// Fields in emission order
    pub metrics: Vec<EntryMetric>,
}

impl UkmEntry {
    /// Empty entry
    pub fn new(event: EventKind, source_id: SourceId) -> Self {
        Self {
            event,
            source_id,
            metrics: Vec::new(),
        }
    }

    /// Append a field
    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        self.metrics.push(EntryMetric {
            name: name.into(),
            value,
        });
    }

    /// Value of a field, if present
    pub fn metric(&self, name: &str) -> Option<i64> {
        self.metrics
            .iter()
            .find(|metric| metric.name == name)
            .map(|metric| metric.value)
    }

    /// Whether a field is present
    pub fn has_metric(&self, name: &str) -> bool {
        self.metric(name).is_some()
    }
}

/// Destination for everything the aggregator reports.
pub trait MetricsSink: Send + Sync {
    /// Record a keyed event
    fn record_entry(&self, entry: UkmEntry);

    /// Add one sample to a cumulative histogram
    fn record_histogram(&self, name: &str, sample: i64);

    /// Record a boolean histogram sample
    fn record_boolean(&self, name: &str, value: bool) {
        self.record_histogram(name, i64::from(value));
    }
}

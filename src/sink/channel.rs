//! Sink that hands records to another thread over a bounded channel.

use super::{MetricsSink, UkmEntry};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A record in transit to the host's metrics pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SinkRecord {
    /// Keyed event
    Entry(UkmEntry),
    /// Histogram sample
    Histogram {
        /// Histogram name
        name: String,
        /// Recorded value
        sample: i64,
    },
}

/// Non-blocking enqueue into a bounded channel.
///
/// When the channel is full or the receiver is gone the record is dropped and
/// counted; the aggregator never waits on the pipeline.
pub struct ChannelSink {
    tx: Sender<SinkRecord>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn bounded(capacity: usize) -> (Self, Receiver<SinkRecord>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Records dropped because the channel could not take them
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, record: SinkRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped, "Metrics channel full, dropping record");
            },
            Err(TrySendError::Disconnected(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped, "Metrics channel disconnected, dropping record");
            },
        }
    }
}

impl MetricsSink for ChannelSink {
    fn record_entry(&self, entry: UkmEntry) {
        self.send(SinkRecord::Entry(entry));
    }

    fn record_histogram(&self, name: &str, sample: i64) {
        self.send(SinkRecord::Histogram {
            name: name.to_string(),
            sample,
        });
    }
}

//! Accumulator and snapshot types.

use std::time::Duration;

/// Opaque compositor bitmask of active frame sequence trackers.
pub type ActiveFrameSequenceTrackers = u64;

/// Running totals for one slot, or for the primary (whole frame) metric.
///
/// All values are microseconds, except for slots that count events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricRecord {
    /// Accumulated since the last end of frame
    pub interval_count: i64,
    /// Part of `interval_count` inside a main frame update
    pub main_frame_count: i64,
    /// Accumulated from creation until first contentful paint
    pub pre_fcp_aggregate: i64,
}

impl MetricRecord {
    /// Add one sample
    #[inline]
    pub fn add(&mut self, count: i64, in_main_frame_update: bool, is_pre_fcp: bool) {
        self.interval_count = self.interval_count.saturating_add(count);
        if in_main_frame_update {
            self.main_frame_count = self.main_frame_count.saturating_add(count);
        }
        if is_pre_fcp {
            self.pre_fcp_aggregate = self.pre_fcp_aggregate.saturating_add(count);
        }
    }

    /// Clear the per-frame counters. The pre-FCP aggregate is kept.
    #[inline]
    pub fn reset_interval(&mut self) {
        self.interval_count = 0;
        self.main_frame_count = 0;
    }
}

/// Snapshot of one frame, retained for the next periodic report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    /// Whole-frame duration in microseconds
    pub primary_metric_count: i64,
    /// `interval_count` per slot, indexed by slot id
    pub sub_metrics_counts: Vec<i64>,
    /// `main_frame_count` per slot, indexed by slot id
    pub sub_main_frame_counts: Vec<i64>,
    /// Active frame sequence trackers bitmask
    pub trackers: ActiveFrameSequenceTrackers,
}

impl Sample {
    /// Zeroed sample sized for `slot_count` slots
    pub fn with_slots(slot_count: usize) -> Self {
        Self {
            primary_metric_count: 0,
            sub_metrics_counts: vec![0; slot_count],
            sub_main_frame_counts: vec![0; slot_count],
            trackers: 0,
        }
    }

    /// Replace the whole sample with the current records
    pub(crate) fn capture(
        &mut self,
        primary: &MetricRecord,
        records: &[MetricRecord],
        trackers: ActiveFrameSequenceTrackers,
    ) {
        self.primary_metric_count = primary.interval_count;
        self.sub_metrics_counts.clear();
        self.sub_metrics_counts.extend(records.iter().map(|r| r.interval_count));
        self.sub_main_frame_counts.clear();
        self.sub_main_frame_counts.extend(records.iter().map(|r| r.main_frame_count));
        self.trackers = trackers;
    }
}

/// Phase durations of the main frame in progress, handed to the compositor.
///
/// Hit testing is left out because it overlaps the other phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeginMainFrameMetrics {
    /// Input event dispatch
    pub handle_input_events: Duration,
    /// Animation ticks
    pub animate: Duration,
    /// Style recalculation
    pub style_update: Duration,
    /// Layout
    pub layout_update: Duration,
    /// Accessibility tree update
    pub accessibility: Duration,
    /// Pre-paint tree walk
    pub prepaint: Duration,
    /// Compositing input update
    pub compositing_inputs: Duration,
    /// Paint
    pub paint: Duration,
    /// Main-thread compositor commit
    pub composite_commit: Duration,
    /// Whether first contentful paint has been reached
    pub should_measure_smoothness: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_add_and_reset() {
        let mut record = MetricRecord::default();
        record.add(100, true, true);
        record.add(50, false, true);
        record.add(25, true, false);

        assert_eq!(record.interval_count, 175);
        assert_eq!(record.main_frame_count, 125);
        assert_eq!(record.pre_fcp_aggregate, 150);

        record.reset_interval();
        assert_eq!(
            record,
            MetricRecord {
                interval_count: 0,
                main_frame_count: 0,
                pre_fcp_aggregate: 150,
            }
        );
    }

    #[test]
    fn test_sample_capture_replaces_everything() {
        let records = [
            MetricRecord {
                interval_count: 5,
                main_frame_count: 3,
                pre_fcp_aggregate: 0,
            },
            MetricRecord {
                interval_count: 7,
                main_frame_count: 7,
                pre_fcp_aggregate: 0,
            },
        ];
        let primary = MetricRecord {
            interval_count: 12,
            ..MetricRecord::default()
        };

        let mut sample = Sample::with_slots(2);
        sample.capture(&primary, &records, 0b101);
        assert_eq!(sample.primary_metric_count, 12);
        assert_eq!(sample.sub_metrics_counts, vec![5, 7]);
        assert_eq!(sample.sub_main_frame_counts, vec![3, 7]);
        assert_eq!(sample.trackers, 0b101);
    }
}

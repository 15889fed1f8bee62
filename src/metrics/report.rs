//! Serialization of samples and aggregates into sink entries.
//!
//! Field and histogram names are derived from the slot table once, when the
//! aggregator is built, and reused for every report.

use super::bucketing::ExponentialBucketing;
use super::slots::{MetricSlot, SlotId, SlotTable};
use super::types::{ActiveFrameSequenceTrackers, MetricRecord, Sample};
use crate::sink::{EventKind, SourceId, UkmEntry};

/// Name of the whole-frame metric.
pub const PRIMARY_METRIC_NAME: &str = "MainFrame";
/// Entry field carrying the pre/post first contentful paint flag.
pub const IS_BEFORE_FCP_FIELD: &str = "MainFrameIsBeforeFCP";
/// Entry field carrying the compositor tracker bitmask.
pub const TRACKERS_FIELD: &str = "MainFrameReasons";
/// Suffix appended to a slot name for its main-frame-only field.
pub const BEGIN_MAIN_FRAME_SUFFIX: &str = "BeginMainFrame";

/// Histogram names for one metric.
#[derive(Debug, Clone)]
pub(crate) struct HistogramNames {
    pub pre_fcp: String,
    pub post_fcp: String,
    pub aggregated_pre_fcp: String,
}

impl HistogramNames {
    fn new(prefix: &str, metric: &str) -> Self {
        Self {
            pre_fcp: format!("{}.{}.UpdateTime.PreFCP", prefix, metric),
            post_fcp: format!("{}.{}.UpdateTime.PostFCP", prefix, metric),
            aggregated_pre_fcp: format!("{}.{}.UpdateTime.AggregatedPreFCP", prefix, metric),
        }
    }

    /// Pre- or post-FCP counter; the two never share a sample
    #[inline]
    pub fn for_phase(&self, is_pre_fcp: bool) -> &str {
        if is_pre_fcp {
            &self.pre_fcp
        } else {
            &self.post_fcp
        }
    }
}

/// Every precomputed name the aggregator reports under.
#[derive(Debug, Clone)]
pub(crate) struct ReportNames {
    pub primary: HistogramNames,
    pub slots: Vec<HistogramNames>,
    pub begin_main_frame_fields: Vec<String>,
    pub did_reach_fcp: String,
    pub did_reach_fcp_main_frame: String,
}

impl ReportNames {
    pub fn new(prefix: &str, table: &SlotTable) -> Self {
        Self {
            primary: HistogramNames::new(prefix, PRIMARY_METRIC_NAME),
            slots: table
                .iter()
                .map(|slot| HistogramNames::new(prefix, &slot.name))
                .collect(),
            begin_main_frame_fields: table
                .iter()
                .map(|slot| format!("{}{}", slot.name, BEGIN_MAIN_FRAME_SUFFIX))
                .collect(),
            did_reach_fcp: format!("{}.LocalFrameRoot.DidReachFirstContentfulPaint", prefix),
            did_reach_fcp_main_frame: format!(
                "{}.LocalFrameRoot.DidReachFirstContentfulPaint.MainFrame",
                prefix
            ),
        }
    }

    #[inline]
    pub fn slot(&self, slot: SlotId) -> &HistogramNames {
        &self.slots[slot.index()]
    }
}

/// Value as it may leave the process for `slot`.
#[inline]
pub fn bucket_if_necessary(value: i64, slot: &MetricSlot, bucketing: ExponentialBucketing) -> i64 {
    if slot.bucketed {
        bucketing.bucket_min(value)
    } else {
        value
    }
}

/// Periodic per-frame entry from the retained sample.
pub(crate) fn update_time_entry(
    source_id: SourceId,
    table: &SlotTable,
    names: &ReportNames,
    sample: &Sample,
    is_before_fcp: bool,
    bucketing: ExponentialBucketing,
) -> UkmEntry {
    let mut entry = UkmEntry::new(EventKind::UpdateTime, source_id);
    entry.set(PRIMARY_METRIC_NAME, sample.primary_metric_count);

    for slot in table {
        let index = slot.id.index();
        entry.set(
            slot.name.as_str(),
            bucket_if_necessary(sample.sub_metrics_counts[index], slot, bucketing),
        );
        entry.set(
            names.begin_main_frame_fields[index].as_str(),
            bucket_if_necessary(sample.sub_main_frame_counts[index], slot, bucketing),
        );
    }

    entry.set(IS_BEFORE_FCP_FIELD, i64::from(is_before_fcp));
    entry.set(TRACKERS_FIELD, trackers_value(sample.trackers));
    entry
}

/// One-time entry with everything accumulated before first contentful paint.
pub(crate) fn page_load_entry(
    source_id: SourceId,
    table: &SlotTable,
    primary: &MetricRecord,
    records: &[MetricRecord],
    trackers: ActiveFrameSequenceTrackers,
    bucketing: ExponentialBucketing,
) -> UkmEntry {
    let mut entry = UkmEntry::new(EventKind::PageLoad, source_id);
    entry.set(PRIMARY_METRIC_NAME, primary.pre_fcp_aggregate);

    for slot in table {
        entry.set(
            slot.name.as_str(),
            bucket_if_necessary(records[slot.id.index()].pre_fcp_aggregate, slot, bucketing),
        );
    }

    entry.set(TRACKERS_FIELD, trackers_value(trackers));
    entry
}

/// Entries hold signed values; the bitmask is passed through bit for bit.
#[inline]
fn trackers_value(trackers: ActiveFrameSequenceTrackers) -> i64 {
    i64::from_ne_bytes(trackers.to_ne_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::slots::SlotSpec;

    fn table() -> SlotTable {
        SlotTable::from_specs(&[
            SlotSpec::timer("Style"),
            SlotSpec::timer("ObserverCount").bucketed(),
        ])
        .unwrap()
    }

    #[test]
    fn test_names() {
        let names = ReportNames::new("Blink", &table());
        assert_eq!(names.primary.pre_fcp, "Blink.MainFrame.UpdateTime.PreFCP");
        assert_eq!(names.slot(SlotId(0)).post_fcp, "Blink.Style.UpdateTime.PostFCP");
        assert_eq!(
            names.slot(SlotId(1)).aggregated_pre_fcp,
            "Blink.ObserverCount.UpdateTime.AggregatedPreFCP"
        );
        assert_eq!(names.begin_main_frame_fields[0], "StyleBeginMainFrame");
        assert_eq!(names.slot(SlotId(0)).for_phase(true), "Blink.Style.UpdateTime.PreFCP");
    }

    #[test]
    fn test_update_time_entry_buckets_flagged_slots() {
        let table = table();
        let names = ReportNames::new("Blink", &table);
        let sample = Sample {
            primary_metric_count: 16_000,
            sub_metrics_counts: vec![1_000, 38],
            sub_main_frame_counts: vec![900, 38],
            trackers: 12,
        };

        let entry = update_time_entry(
            SourceId(1),
            &table,
            &names,
            &sample,
            true,
            ExponentialBucketing::Coarse,
        );
        assert_eq!(entry.event, EventKind::UpdateTime);
        assert_eq!(entry.metric("MainFrame"), Some(16_000));
        assert_eq!(entry.metric("Style"), Some(1_000));
        assert_eq!(entry.metric("StyleBeginMainFrame"), Some(900));
        assert_eq!(entry.metric("ObserverCount"), Some(32));
        assert_eq!(entry.metric("ObserverCountBeginMainFrame"), Some(32));
        assert_eq!(entry.metric(IS_BEFORE_FCP_FIELD), Some(1));
        assert_eq!(entry.metric(TRACKERS_FIELD), Some(12));
    }

    #[test]
    fn test_page_load_entry() {
        let table = table();
        let primary = MetricRecord {
            pre_fcp_aggregate: 50_000,
            ..MetricRecord::default()
        };
        let records = [
            MetricRecord {
                pre_fcp_aggregate: 2_000,
                ..MetricRecord::default()
            },
            MetricRecord {
                pre_fcp_aggregate: 1_025,
                ..MetricRecord::default()
            },
        ];

        let entry = page_load_entry(
            SourceId(1),
            &table,
            &primary,
            &records,
            u64::MAX,
            ExponentialBucketing::Coarse,
        );
        assert_eq!(entry.event, EventKind::PageLoad);
        assert_eq!(entry.metric("MainFrame"), Some(50_000));
        assert_eq!(entry.metric("Style"), Some(2_000));
        assert_eq!(entry.metric("ObserverCount"), Some(1_024));
        assert_eq!(entry.metric(TRACKERS_FIELD), Some(-1));
        assert!(!entry.has_metric("StyleBeginMainFrame"));
    }
}

//! Common test utilities and fixtures.

#![allow(dead_code)]

use frame_ukm::core::{Config, ConfigBuilder, ManualTickClock, TickClock, TimeDelta, TimeTicks};
use frame_ukm::metrics::{
    ActiveFrameSequenceTrackers, FrameUkmAggregator, SlotId, SlotRole, SlotTable,
};
use frame_ukm::sink::{EventKind, MemoryRecorder, MetricsSink, SourceId, UkmEntry};
use std::sync::Arc;

/// Aggregator wired to a manual clock and an in-memory recorder.
///
/// The recorder and clock survive aggregator restarts, so several
/// aggregator lifetimes can be checked against one recording.
pub struct Harness {
    aggregator: Option<FrameUkmAggregator>,
    pub recorder: Arc<MemoryRecorder>,
    pub clock: ManualTickClock,
    config: Config,
    slots: SlotTable,
    next_source: i64,
}

impl Harness {
    /// Standard slot table, deterministic sampling
    pub fn new() -> Self {
        Self::with_config(ConfigBuilder::new().seed(42).build().unwrap())
    }

    pub fn with_config(config: Config) -> Self {
        let slots = config.slot_table().unwrap();
        let mut harness = Self {
            aggregator: None,
            recorder: Arc::new(MemoryRecorder::new()),
            clock: ManualTickClock::starting_at(TimeTicks::from_micros(1_000_000)),
            config,
            slots,
            next_source: 1,
        };
        harness.restart_aggregator();
        harness
    }

    pub fn aggregator(&self) -> &FrameUkmAggregator {
        self.aggregator.as_ref().expect("aggregator is running")
    }

    pub fn source_id(&self) -> SourceId {
        self.aggregator().source_id()
    }

    pub fn now(&self) -> TimeTicks {
        self.clock.now_ticks()
    }

    pub fn advance_ms(&self, millis: i64) {
        self.clock.advance(TimeDelta::from_millis(millis));
    }

    pub fn advance_us(&self, micros: i64) {
        self.clock.advance(TimeDelta::from_micros(micros));
    }

    /// Transmit the final sample and destroy the aggregator.
    pub fn reset_aggregator(&mut self) {
        if let Some(aggregator) = self.aggregator.take() {
            aggregator.transmit_final_sample(true);
        }
    }

    /// Replace the aggregator with a fresh one for a new source.
    pub fn restart_aggregator(&mut self) {
        self.reset_aggregator();
        let source_id = SourceId(self.next_source);
        self.next_source += 1;
        let aggregator = FrameUkmAggregator::with_clock(
            &self.config,
            source_id,
            Arc::clone(&self.recorder) as Arc<dyn MetricsSink>,
            Box::new(self.clock.clone()),
        )
        .unwrap();
        self.aggregator = Some(aggregator);
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> SlotId {
        self.slots
            .find(name)
            .unwrap_or_else(|| panic!("no slot named {}", name))
    }

    pub fn slot_name(&self, slot: SlotId) -> String {
        self.slots.get(slot).unwrap().name.clone()
    }

    /// Slots recorded with plain timers: everything before the forced
    /// layout slot in the standard table.
    pub fn timed_slots(&self) -> Vec<SlotId> {
        let forced = self.slots.slot_for(SlotRole::ForcedStyleAndLayout).unwrap();
        self.slots
            .iter()
            .map(|slot| slot.id)
            .take_while(|&id| id < forced)
            .collect()
    }

    /// Slots from forced layout onward
    pub fn untimed_slots(&self) -> Vec<SlotId> {
        let forced = self.slots.slot_for(SlotRole::ForcedStyleAndLayout).unwrap();
        self.slots
            .iter()
            .map(|slot| slot.id)
            .filter(|&id| id >= forced)
            .collect()
    }

    /// One main frame: every timed slot runs for `millis_per_step`.
    ///
    /// With `mark_fcp`, first contentful paint is signalled while the paint
    /// timer is running.
    pub fn simulate_frame(
        &self,
        start: TimeTicks,
        millis_per_step: i64,
        trackers: ActiveFrameSequenceTrackers,
        mark_fcp: bool,
    ) {
        let aggregator = self.aggregator();
        let paint = aggregator.slots().slot_for(SlotRole::Paint).unwrap();
        aggregator.begin_main_frame(self.now());
        for slot in self.timed_slots() {
            let _timer = aggregator.scoped_timer(slot);
            if mark_fcp && slot == paint {
                aggregator.did_reach_first_contentful_paint();
            }
            self.advance_ms(millis_per_step);
        }
        aggregator.record_end_of_frame_metrics(start, self.now(), trackers);
    }

    /// Timed work outside any main frame
    pub fn simulate_pre_frame(&self, millis_per_step: i64) {
        let aggregator = self.aggregator();
        for slot in self.timed_slots() {
            let _timer = aggregator.scoped_timer(slot);
            self.advance_ms(millis_per_step);
        }
    }

    /// Number of plain timed slots, i.e. steps in one simulated frame
    pub fn steps_per_frame(&self) -> i64 {
        self.timed_slots().len() as i64
    }

    pub fn update_entries(&self) -> Vec<UkmEntry> {
        self.recorder.entries_by_kind(EventKind::UpdateTime)
    }

    pub fn page_load_entries(&self) -> Vec<UkmEntry> {
        self.recorder.entries_by_kind(EventKind::PageLoad)
    }

    /// Value as the aggregator would report it for `slot`
    pub fn bucket(&self, slot: SlotId, value: i64) -> i64 {
        if self.slots.get(slot).unwrap().bucketed {
            self.config.reporting.bucketing.bucket_min(value)
        } else {
            value
        }
    }

    /// Check one periodic entry. Expected times are in milliseconds.
    pub fn verify_update_entry(
        &self,
        index: usize,
        expected_primary_ms: i64,
        expected_sub_ms: i64,
        expected_begin_main_frame_ms: i64,
        expected_reasons: i64,
        expected_before_fcp: bool,
    ) {
        let entries = self.update_entries();
        assert!(entries.len() > index, "only {} update entries", entries.len());
        let entry = &entries[index];

        assert_eq!(entry.metric("MainFrame"), Some(expected_primary_ms * 1_000));
        for slot in self.timed_slots() {
            let name = self.slot_name(slot);
            assert_eq!(
                entry.metric(&name),
                Some(self.bucket(slot, expected_sub_ms * 1_000)),
                "{}",
                name
            );
            assert_eq!(
                entry.metric(&format!("{}BeginMainFrame", name)),
                Some(self.bucket(slot, expected_begin_main_frame_ms * 1_000)),
                "{}BeginMainFrame",
                name
            );
        }
        assert_eq!(
            entry.metric("MainFrameIsBeforeFCP"),
            Some(i64::from(expected_before_fcp))
        );
        assert_eq!(entry.metric("MainFrameReasons"), Some(expected_reasons));
    }

    /// Check every aggregate entry. Expected times are in milliseconds.
    pub fn verify_aggregated_entries(
        &self,
        expected_count: usize,
        expected_primary_ms: i64,
        expected_sub_ms: i64,
    ) {
        let entries = self.page_load_entries();
        assert_eq!(entries.len(), expected_count);
        for entry in &entries {
            assert_eq!(entry.metric("MainFrame"), Some(expected_primary_ms * 1_000));
            for slot in self.timed_slots() {
                let name = self.slot_name(slot);
                assert_eq!(entry.metric(&name), Some(expected_sub_ms * 1_000), "{}", name);
            }
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.reset_aggregator();
    }
}

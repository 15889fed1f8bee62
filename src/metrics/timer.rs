//! RAII timers that attribute elapsed time to slots.
//!
//! Both timers read the aggregator's clock and record nothing at all when that
//! clock is not high resolution.

use super::aggregator::FrameUkmAggregator;
use super::slots::SlotId;
use crate::core::TimeTicks;

/// Times one scope and records it into a slot when dropped.
///
/// Moving the timer moves the responsibility to record; the sample is
/// committed exactly once.
#[must_use = "the timer records when it is dropped; binding it to `_` drops it immediately"]
pub struct ScopedTimer<'a> {
    aggregator: &'a FrameUkmAggregator,
    slot: SlotId,
    start: Option<TimeTicks>,
}

impl<'a> ScopedTimer<'a> {
    pub(crate) fn new(aggregator: &'a FrameUkmAggregator, slot: SlotId) -> Self {
        let start = aggregator.has_high_resolution_clock().then(|| aggregator.now());
        Self {
            aggregator,
            slot,
            start,
        }
    }

    /// Slot the timer records into
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Whether the timer will record anything
    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    /// Stop now and record
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        if let Some(start) = self.start.take() {
            let end = self.aggregator.now();
            self.aggregator.record_timer_sample(self.slot, start, end);
        }
    }
}

/// Times consecutive intervals of one scope, switching the target slot as
/// control moves between phases.
///
/// Intervals are contiguous: the time between the first
/// [`start_interval`](IterativeTimer::start_interval) and drop is split across
/// slots with no gaps or overlap.
#[must_use = "the final interval is recorded when the timer is dropped"]
pub struct IterativeTimer<'a> {
    aggregator: &'a FrameUkmAggregator,
    enabled: bool,
    current: Option<(SlotId, TimeTicks)>,
}

impl<'a> IterativeTimer<'a> {
    /// Create an idle timer; nothing is timed until the first interval
    pub fn new(aggregator: &'a FrameUkmAggregator) -> Self {
        Self {
            aggregator,
            enabled: aggregator.has_high_resolution_clock(),
            current: None,
        }
    }

    /// Attribute time from now on to `slot`.
    ///
    /// Switching to a different slot records the interval that just ended;
    /// restarting the same slot keeps accumulating into it.
    pub fn start_interval(&mut self, slot: SlotId) {
        if !self.enabled {
            return;
        }

        match self.current {
            Some((active, _)) if active == slot => {},
            Some((active, start)) => {
                let now = self.aggregator.now();
                self.aggregator.record_timer_sample(active, start, now);
                self.current = Some((slot, now));
            },
            None => {
                self.current = Some((slot, self.aggregator.now()));
            },
        }
    }

    /// Slot currently accumulating, if any
    pub fn active_slot(&self) -> Option<SlotId> {
        self.current.map(|(slot, _)| slot)
    }
}

impl Drop for IterativeTimer<'_> {
    fn drop(&mut self) {
        if let Some((slot, start)) = self.current.take() {
            let end = self.aggregator.now();
            self.aggregator.record_timer_sample(slot, start, end);
        }
    }
}

//! Per-frame rendering time aggregator.
//!
//! The aggregator accumulates time (or event counts) per slot across each
//! frame, keeps one representative frame per reporting interval, and reports
//! it the next time a frame carries a report. Everything recorded before first
//! contentful paint is also summed and reported once, on the frame that
//! reached it.
//!
//! All methods take `&self`: timers borrow the aggregator for their whole
//! scope while host signals (first contentful paint, forced layouts) keep
//! arriving in between. State lives behind a `RefCell`, which also makes the
//! aggregator `!Sync`; it belongs to the one sequence that drives rendering.

use super::bucketing::ExponentialBucketing;
use super::milestone::MilestoneState;
use super::reason::DocumentUpdateReason;
use super::report::{self, ReportNames};
use super::slots::{SlotId, SlotRole, SlotTable};
use super::timer::{IterativeTimer, ScopedTimer};
use super::types::{ActiveFrameSequenceTrackers, BeginMainFrameMetrics, MetricRecord, Sample};
use crate::core::{Config, Result, SystemTickClock, TickClock, TimeDelta, TimeTicks};
use crate::sampling::{FrameChoice, InstrumentationSubsampler, ReservoirSampler, UmaThinning};
use crate::sink::{MetricsSink, SourceId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Mutable part of the aggregator.
struct AggregatorState {
    clock: Box<dyn TickClock>,
    rng: StdRng,
    primary: MetricRecord,
    records: Vec<MetricRecord>,
    sample: Sample,
    reservoir: ReservoirSampler,
    milestone: MilestoneState,
    in_main_frame_update: bool,
    subsampler: InstrumentationSubsampler,
    forced_layout_thinning: UmaThinning,
    intersection_observer_sample_period: u64,
    /// Valid main frames seen over the aggregator's lifetime
    main_frames_observed: u64,
    pending_frame_request: Option<TimeTicks>,
    final_sample_transmitted: bool,
}

impl AggregatorState {
    fn reset_intervals(&mut self) {
        self.primary.reset_interval();
        for record in &mut self.records {
            record.reset_interval();
        }
    }
}

/// Aggregates rendering phase timings per frame and reports them to a
/// [`MetricsSink`].
pub struct FrameUkmAggregator {
    source_id: SourceId,
    sink: Arc<dyn MetricsSink>,
    slots: SlotTable,
    names: ReportNames,
    bucketing: ExponentialBucketing,
    is_for_main_frame: bool,
    state: RefCell<AggregatorState>,
}

impl FrameUkmAggregator {
    /// Create an aggregator timed by the system clock.
    pub fn new(config: &Config, source_id: SourceId, sink: Arc<dyn MetricsSink>) -> Result<Self> {
        Self::with_clock(config, source_id, sink, Box::new(SystemTickClock::new()))
    }

    /// Create an aggregator timed by `clock`.
    ///
    /// Fails only if `config` does not validate.
    pub fn with_clock(
        config: &Config,
        source_id: SourceId,
        sink: Arc<dyn MetricsSink>,
        clock: Box<dyn TickClock>,
    ) -> Result<Self> {
        config.validate()?;
        let slots = config.slot_table()?;
        let names = ReportNames::new(&config.reporting.histogram_prefix, &slots);
        let sampling = &config.sampling;

        let rng = match sampling.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::debug!(
            "Creating frame aggregator for source {} with {} slots",
            source_id,
            slots.len()
        );

        let state = AggregatorState {
            clock,
            rng,
            primary: MetricRecord::default(),
            records: vec![MetricRecord::default(); slots.len()],
            sample: Sample::with_slots(slots.len()),
            reservoir: ReservoirSampler::new(),
            milestone: MilestoneState::default(),
            in_main_frame_update: false,
            subsampler: InstrumentationSubsampler::new(sampling.instrumentation_sample_rate),
            forced_layout_thinning: UmaThinning::new(sampling.forced_layout_uma_mean_interval),
            intersection_observer_sample_period: u64::from(
                sampling.intersection_observer_sample_period,
            ),
            main_frames_observed: 0,
            pending_frame_request: None,
            final_sample_transmitted: false,
        };

        Ok(Self {
            source_id,
            sink,
            slots,
            names,
            bucketing: config.reporting.bucketing,
            is_for_main_frame: true,
            state: RefCell::new(state),
        })
    }

    /// Mark whether this aggregator belongs to the outermost frame of the
    /// page. Defaults to `true`.
    pub fn with_main_frame(mut self, is_for_main_frame: bool) -> Self {
        self.is_for_main_frame = is_for_main_frame;
        self
    }

    /// Source the reported events are keyed by
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// The slot table in use
    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Value as reported for `slot`, bucketed if the slot asks for it.
    pub fn apply_bucket_if_necessary(&self, value: i64, slot: SlotId) -> i64 {
        match self.slots.get(slot) {
            Some(meta) => report::bucket_if_necessary(value, meta, self.bucketing),
            None => value,
        }
    }

    /// Time a scope into `slot`; the sample is recorded when the timer drops.
    pub fn scoped_timer(&self, slot: SlotId) -> ScopedTimer<'_> {
        ScopedTimer::new(self, slot)
    }

    /// Time consecutive phases of one scope; see [`IterativeTimer`].
    pub fn iterative_timer(&self) -> IterativeTimer<'_> {
        IterativeTimer::new(self)
    }

    pub(crate) fn now(&self) -> TimeTicks {
        self.state.borrow().clock.now_ticks()
    }

    pub(crate) fn has_high_resolution_clock(&self) -> bool {
        self.state.borrow().clock.is_high_resolution()
    }

    /// Record the time between `start` and `end` into `slot`.
    pub fn record_timer_sample(&self, slot: SlotId, start: TimeTicks, end: TimeTicks) {
        self.record_count_sample(slot, (end - start).in_microseconds());
    }

    /// Add `count` to `slot`.
    ///
    /// Forced layouts must go through
    /// [`record_forced_layout_sample`](Self::record_forced_layout_sample).
    pub fn record_count_sample(&self, slot: SlotId, count: i64) {
        let Some(meta) = self.slots.get(slot) else {
            debug_assert!(false, "unknown slot {}", slot);
            return;
        };
        debug_assert!(
            meta.role != Some(SlotRole::ForcedStyleAndLayout),
            "forced layouts are recorded through record_forced_layout_sample"
        );

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.subsampler.should_sample(&mut state.rng) {
            return;
        }

        let is_pre_fcp = state.milestone.is_pre_milestone();
        state.records[slot.index()].add(count, state.in_main_frame_update, is_pre_fcp);

        if meta.has_uma && (!meta.intersection_observer || Self::is_observer_frame(state)) {
            self.sink.record_histogram(self.names.slot(slot).for_phase(is_pre_fcp), count);
        }
    }

    /// Record a forced style and layout update caused by `reason`.
    ///
    /// The time is added to the forced layout slot and, when the reason has a
    /// category, to that category's slot. Histograms for both are thinned;
    /// the accumulated values are not.
    pub fn record_forced_layout_sample(
        &self,
        reason: DocumentUpdateReason,
        start: TimeTicks,
        end: TimeTicks,
    ) {
        let Some(forced) = self.slots.slot_for(SlotRole::ForcedStyleAndLayout) else {
            tracing::trace!("No forced layout slot configured, dropping {:?}", reason);
            return;
        };
        let count = (end - start).in_microseconds();
        let category_slot = reason
            .category()
            .and_then(|category| self.slots.slot_for(category.role()));

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let is_pre_fcp = state.milestone.is_pre_milestone();
        let report_uma = state.forced_layout_thinning.should_report(&mut state.rng);

        for slot in std::iter::once(forced).chain(category_slot) {
            state.records[slot.index()].add(count, state.in_main_frame_update, is_pre_fcp);
            let has_uma = self.slots.get(slot).map_or(false, |meta| meta.has_uma);
            if report_uma && has_uma {
                self.sink.record_histogram(self.names.slot(slot).for_phase(is_pre_fcp), count);
            }
        }
    }

    /// Record a compositor commit that was requested, possibly started, and
    /// completed.
    ///
    /// A commit that never started spent no time waiting; the whole span is
    /// commit time.
    pub fn record_impl_compositor_sample(
        &self,
        requested: TimeTicks,
        started: Option<TimeTicks>,
        completed: TimeTicks,
    ) {
        let Some(commit) = self.slots.slot_for(SlotRole::ImplCompositorCommit) else {
            return;
        };

        match started {
            Some(started) => {
                if let Some(wait) = self.slots.slot_for(SlotRole::WaitForCommit) {
                    self.record_timer_sample(wait, requested, started);
                }
                self.record_timer_sample(commit, started, completed);
            },
            None => self.record_timer_sample(commit, requested, completed),
        }
    }

    /// Note that the host asked for a visual update. Only the first request
    /// before a frame counts.
    pub fn did_request_frame(&self) {
        let mut state = self.state.borrow_mut();
        if state.pending_frame_request.is_none() {
            let now = state.clock.now_ticks();
            state.pending_frame_request = Some(now);
        }
    }

    /// Enter the main frame update for the frame starting at `frame_time`.
    pub fn begin_main_frame(&self, frame_time: TimeTicks) {
        let delay = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            debug_assert!(
                !state.in_main_frame_update,
                "begin_main_frame called twice without ending the update"
            );
            state.in_main_frame_update = true;

            match state.pending_frame_request {
                Some(requested) if requested <= frame_time => {
                    state.pending_frame_request = None;
                    Some(frame_time - requested)
                },
                _ => None,
            }
        };

        if let (Some(delay), Some(slot)) = (delay, self.slots.slot_for(SlotRole::VisualUpdateDelay))
        {
            tracing::trace!("Visual update delay {}", delay);
            self.record_count_sample(slot, delay.in_microseconds());
        }
    }

    /// Leave the main frame update without reporting it.
    ///
    /// Work recorded so far stays in the per-frame counters and is carried
    /// into the next frame that ends normally.
    pub fn did_begin_main_frame(&self) {
        self.state.borrow_mut().in_main_frame_update = false;
    }

    /// Signal first contentful paint. Only the first signal has an effect.
    pub fn did_reach_first_contentful_paint(&self) {
        if self.state.borrow_mut().milestone.reach() {
            tracing::debug!("First contentful paint reached for source {}", self.source_id);
        } else {
            tracing::debug!("Ignoring repeated first contentful paint signal");
        }
    }

    /// Close the frame spanning `start` to `end`, pick it as the sample or not,
    /// and report whatever is due.
    pub fn record_end_of_frame_metrics(
        &self,
        start: TimeTicks,
        end: TimeTicks,
        trackers: ActiveFrameSequenceTrackers,
    ) {
        let count = (end - start).in_microseconds();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let was_in_main_frame_update = state.in_main_frame_update;
        state.in_main_frame_update = false;
        if !was_in_main_frame_update || count <= 0 {
            tracing::trace!("Skipping frame report, duration {}us", count);
            state.reset_intervals();
            return;
        }

        let is_pre_fcp = state.milestone.is_pre_milestone();
        self.sink.record_histogram(self.names.primary.for_phase(is_pre_fcp), count);
        state.primary.add(count, true, is_pre_fcp);

        if state.reservoir.observe_frame(&mut state.rng) {
            state.sample.capture(&state.primary, &state.records, trackers);
        }
        state.main_frames_observed = state.main_frames_observed.saturating_add(1);

        if state.milestone == MilestoneState::ReachedThisFrame {
            self.report_pre_fcp_event(state, trackers);
            self.report_update_time_event_locked(state);
            state.milestone.complete_frame();
        }

        state.reset_intervals();
    }

    /// Report the retained sample, if any frame was seen since the last
    /// report.
    pub fn report_update_time_event(&self) {
        let mut state = self.state.borrow_mut();
        self.report_update_time_event_locked(&mut state);
    }

    fn report_update_time_event_locked(&self, state: &mut AggregatorState) {
        if state.reservoir.frames_since_last_report() == 0 {
            return;
        }

        let entry = report::update_time_entry(
            self.source_id,
            &self.slots,
            &self.names,
            &state.sample,
            state.milestone.is_pre_milestone(),
            self.bucketing,
        );
        self.sink.record_entry(entry);
        state.reservoir.reset();
    }

    fn report_pre_fcp_event(&self, state: &AggregatorState, trackers: ActiveFrameSequenceTrackers) {
        tracing::debug!(
            "Reporting pre-FCP aggregate for source {}: {}us",
            self.source_id,
            state.primary.pre_fcp_aggregate
        );

        self.sink.record_histogram(
            &self.names.primary.aggregated_pre_fcp,
            state.primary.pre_fcp_aggregate,
        );
        for slot in self.slots.iter().filter(|slot| slot.has_uma) {
            self.sink.record_histogram(
                &self.names.slot(slot.id).aggregated_pre_fcp,
                state.records[slot.id.index()].pre_fcp_aggregate,
            );
        }

        let entry = report::page_load_entry(
            self.source_id,
            &self.slots,
            &state.primary,
            &state.records,
            trackers,
            self.bucketing,
        );
        self.sink.record_entry(entry);
    }

    /// Phase durations of the main frame in progress.
    ///
    /// Must be called inside a main frame update.
    pub fn begin_main_frame_metrics(&self) -> BeginMainFrameMetrics {
        let state = self.state.borrow();
        debug_assert!(
            state.in_main_frame_update,
            "begin_main_frame_metrics called outside a main frame update"
        );

        let duration = |role: SlotRole| -> Duration {
            self.slots.slot_for(role).map_or(Duration::ZERO, |slot| {
                TimeDelta::from_micros(state.records[slot.index()].main_frame_count).to_duration()
            })
        };

        BeginMainFrameMetrics {
            handle_input_events: duration(SlotRole::HandleInputEvents),
            animate: duration(SlotRole::Animate),
            style_update: duration(SlotRole::Style),
            layout_update: duration(SlotRole::Layout),
            accessibility: duration(SlotRole::Accessibility),
            prepaint: duration(SlotRole::PrePaint),
            compositing_inputs: duration(SlotRole::CompositingInputs),
            paint: duration(SlotRole::Paint),
            composite_commit: duration(SlotRole::CompositingCommit),
            should_measure_smoothness: state.milestone.has_reached(),
        }
    }

    /// Flush the pending sample and record whether first contentful paint
    /// was ever reached. The booleans are recorded once; later calls only
    /// flush.
    pub fn transmit_final_sample(&self, is_for_main_frame: bool) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        self.report_update_time_event_locked(state);

        if state.final_sample_transmitted {
            return;
        }
        state.final_sample_transmitted = true;

        let reached = state.milestone.has_reached();
        self.sink.record_boolean(&self.names.did_reach_fcp, reached);
        if is_for_main_frame {
            self.sink.record_boolean(&self.names.did_reach_fcp_main_frame, reached);
        }
    }

    /// Copy of the retained sample
    pub fn current_sample(&self) -> Sample {
        self.state.borrow().sample.clone()
    }

    /// Frames since the last report
    pub fn frames_since_last_report(&self) -> u64 {
        self.state.borrow().reservoir.frames_since_last_report()
    }

    /// Force every following frame to become the sample
    pub fn choose_next_frame_for_test(&self) {
        self.state.borrow_mut().reservoir.set_choice(FrameChoice::MustChoose);
    }

    /// Keep every following frame out of the sample
    pub fn do_not_choose_next_frame_for_test(&self) {
        self.state.borrow_mut().reservoir.set_choice(FrameChoice::MustNotChoose);
    }

    /// Return to random sample selection
    pub fn clear_frame_choice_for_test(&self) {
        self.state.borrow_mut().reservoir.set_choice(FrameChoice::NoPreference);
    }

    /// Replace the clock
    pub fn set_tick_clock_for_testing(&self, clock: Box<dyn TickClock>) {
        self.state.borrow_mut().clock = clock;
    }

    /// Override the intersection observer sample period
    pub fn set_intersection_observer_sample_period_for_testing(&self, period: u64) {
        self.state.borrow_mut().intersection_observer_sample_period = period.max(1);
    }

    /// Whether samples still count toward the pre-FCP aggregate
    pub fn is_before_fcp_for_testing(&self) -> bool {
        self.state.borrow().milestone.is_pre_milestone()
    }

    /// Per-frame count accumulated so far for `slot`
    pub fn interval_count_for_testing(&self, slot: SlotId) -> i64 {
        self.state
            .borrow()
            .records
            .get(slot.index())
            .map_or(0, |record| record.interval_count)
    }

    /// Intersection observer histograms are emitted on the first of every
    /// `period` main frames.
    fn is_observer_frame(state: &AggregatorState) -> bool {
        state.main_frames_observed % state.intersection_observer_sample_period == 0
    }
}

impl Drop for FrameUkmAggregator {
    fn drop(&mut self) {
        self.transmit_final_sample(self.is_for_main_frame);
    }
}

impl fmt::Debug for FrameUkmAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FrameUkmAggregator");
        debug
            .field("source_id", &self.source_id)
            .field("slots", &self.slots.len())
            .field("is_for_main_frame", &self.is_for_main_frame);
        if let Ok(state) = self.state.try_borrow() {
            debug
                .field("milestone", &state.milestone)
                .field("in_main_frame_update", &state.in_main_frame_update)
                .field("frames_since_last_report", &state.reservoir.frames_since_last_report());
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfigBuilder, ManualTickClock};
    use crate::metrics::slots::SlotSpec;
    use crate::sink::{EventKind, MemoryRecorder};

    fn setup(specs: Vec<SlotSpec>) -> (FrameUkmAggregator, Arc<MemoryRecorder>, ManualTickClock) {
        let config = ConfigBuilder::new().slots(specs).seed(1).build().unwrap();
        let recorder = Arc::new(MemoryRecorder::new());
        let clock = ManualTickClock::new();
        let aggregator = FrameUkmAggregator::with_clock(
            &config,
            SourceId(1),
            Arc::clone(&recorder) as Arc<dyn MetricsSink>,
            Box::new(clock.clone()),
        )
        .unwrap();
        (aggregator, recorder, clock)
    }

    fn two_slots() -> Vec<SlotSpec> {
        vec![
            SlotSpec::timer("Style").role(SlotRole::Style),
            SlotSpec::timer("Layout").role(SlotRole::Layout),
        ]
    }

    #[test]
    fn test_scoped_timer_records_elapsed_time() {
        let (aggregator, _recorder, clock) = setup(two_slots());
        {
            let _timer = aggregator.scoped_timer(SlotId(0));
            clock.advance(TimeDelta::from_millis(3));
        }
        assert_eq!(aggregator.interval_count_for_testing(SlotId(0)), 3_000);
        assert_eq!(aggregator.interval_count_for_testing(SlotId(1)), 0);
    }

    #[test]
    fn test_moved_timer_records_once() {
        let (aggregator, _recorder, clock) = setup(two_slots());
        let timer = aggregator.scoped_timer(SlotId(1));
        let timers = vec![timer];
        clock.advance(TimeDelta::from_micros(250));
        drop(timers);
        assert_eq!(aggregator.interval_count_for_testing(SlotId(1)), 250);
    }

    #[test]
    fn test_stopped_timer_records_once() {
        let (aggregator, _recorder, clock) = setup(two_slots());
        let timer = aggregator.scoped_timer(SlotId(0));
        clock.advance(TimeDelta::from_micros(400));
        timer.stop();
        clock.advance(TimeDelta::from_millis(5));
        assert_eq!(aggregator.interval_count_for_testing(SlotId(0)), 400);
    }

    #[test]
    fn test_iterative_timer_partitions_time() {
        let (aggregator, _recorder, clock) = setup(two_slots());
        {
            let mut timer = aggregator.iterative_timer();
            timer.start_interval(SlotId(0));
            clock.advance(TimeDelta::from_micros(10));
            timer.start_interval(SlotId(0));
            clock.advance(TimeDelta::from_micros(5));
            timer.start_interval(SlotId(1));
            assert_eq!(timer.active_slot(), Some(SlotId(1)));
            clock.advance(TimeDelta::from_micros(7));
        }
        assert_eq!(aggregator.interval_count_for_testing(SlotId(0)), 15);
        assert_eq!(aggregator.interval_count_for_testing(SlotId(1)), 7);
    }

    #[test]
    fn test_low_resolution_clock_disables_timers() {
        let (aggregator, _recorder, clock) = setup(two_slots());
        clock.set_high_resolution(false);
        {
            let timer = aggregator.scoped_timer(SlotId(0));
            assert!(!timer.is_active());
            let mut iterative = aggregator.iterative_timer();
            iterative.start_interval(SlotId(1));
            clock.advance(TimeDelta::from_millis(1));
        }
        assert_eq!(aggregator.interval_count_for_testing(SlotId(0)), 0);
        assert_eq!(aggregator.interval_count_for_testing(SlotId(1)), 0);
    }

    #[test]
    fn test_end_of_frame_outside_update_is_skipped() {
        let (aggregator, recorder, _clock) = setup(two_slots());
        aggregator.record_count_sample(SlotId(0), 40);
        aggregator.record_end_of_frame_metrics(
            TimeTicks::from_micros(0),
            TimeTicks::from_micros(1_000),
            0,
        );

        assert_eq!(aggregator.frames_since_last_report(), 0);
        assert_eq!(aggregator.interval_count_for_testing(SlotId(0)), 0);
        assert_eq!(recorder.histogram_count("Blink.MainFrame.UpdateTime.PreFCP"), 0);
    }

    #[test]
    fn test_forced_layout_without_slot_is_ignored() {
        let (aggregator, recorder, _clock) = setup(two_slots());
        aggregator.record_forced_layout_sample(
            DocumentUpdateReason::JavaScript,
            TimeTicks::from_micros(0),
            TimeTicks::from_micros(10),
        );
        assert_eq!(aggregator.interval_count_for_testing(SlotId(0)), 0);
        assert!(recorder.entries().is_empty());
    }

    #[test]
    fn test_drop_transmits_final_sample() {
        let (aggregator, recorder, _clock) = setup(two_slots());
        aggregator.begin_main_frame(TimeTicks::from_micros(0));
        aggregator.record_end_of_frame_metrics(
            TimeTicks::from_micros(0),
            TimeTicks::from_micros(500),
            0,
        );
        assert_eq!(recorder.entries_count(), 0);

        drop(aggregator);
        assert_eq!(recorder.entries_by_kind(EventKind::UpdateTime).len(), 1);
        assert_eq!(
            recorder.bucket_count("Blink.LocalFrameRoot.DidReachFirstContentfulPaint", 0),
            1
        );
        assert_eq!(
            recorder.bucket_count("Blink.LocalFrameRoot.DidReachFirstContentfulPaint.MainFrame", 0),
            1
        );
    }

    #[test]
    fn test_subframe_skips_main_frame_boolean() {
        let (aggregator, recorder, _clock) = setup(two_slots());
        let aggregator = aggregator.with_main_frame(false);
        aggregator.transmit_final_sample(false);
        aggregator.transmit_final_sample(false);
        drop(aggregator);

        assert_eq!(
            recorder.histogram_count("Blink.LocalFrameRoot.DidReachFirstContentfulPaint"),
            1
        );
        assert_eq!(
            recorder.histogram_count("Blink.LocalFrameRoot.DidReachFirstContentfulPaint.MainFrame"),
            0
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.sampling.instrumentation_sample_rate = 2.0;
        let recorder = Arc::new(MemoryRecorder::new());
        assert!(FrameUkmAggregator::new(&config, SourceId(1), recorder).is_err());
    }
}

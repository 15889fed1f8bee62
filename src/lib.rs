//! frame_ukm - per-frame rendering time aggregation.
//!
//! A renderer brackets every phase of its frame pipeline (style, layout,
//! paint, compositing, ...) with timers. This crate accumulates those timings
//! per frame, keeps one representative frame per reporting interval, and
//! reports it as a keyed event together with cumulative histograms.
//!
//! # Features
//!
//! - **Configurable slot table**: metric categories are data, loaded from YAML
//!   or the built-in rendering pipeline preset
//! - **Reservoir sampling**: one uniformly chosen frame per report
//! - **First contentful paint split**: pre/post histograms and a one-time
//!   aggregate of everything before the milestone
//! - **Privacy bucketing**: exponential, linear and semantic duration buckets
//! - **Deterministic tests**: injectable clock and seeded sampling
//!
//! # Architecture
//!
//! - `core`: errors, configuration, clocks and logging
//! - `metrics`: slots, timers, the aggregator and bucketing
//! - `sampling`: reservoir, thinning and overhead subsampling
//! - `sink`: where reports go
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use frame_ukm::core::{Config, ManualTickClock, TickClock, TimeDelta};
//! use frame_ukm::metrics::{FrameUkmAggregator, SlotRole};
//! use frame_ukm::sink::{MemoryRecorder, SourceId};
//!
//! # fn main() -> frame_ukm::Result<()> {
//! let config = Config::new()?;
//! let recorder = Arc::new(MemoryRecorder::new());
//! let clock = ManualTickClock::new();
//! let aggregator = FrameUkmAggregator::with_clock(
//!     &config,
//!     SourceId(1),
//!     Arc::clone(&recorder) as Arc<dyn frame_ukm::sink::MetricsSink>,
//!     Box::new(clock.clone()),
//! )?;
//!
//! let style = aggregator.slots().slot_for(SlotRole::Style).unwrap();
//! let frame_start = clock.now_ticks();
//! aggregator.begin_main_frame(frame_start);
//! {
//!     let _timer = aggregator.scoped_timer(style);
//!     clock.advance(TimeDelta::from_millis(4));
//! }
//! aggregator.record_end_of_frame_metrics(frame_start, clock.now_ticks(), 0);
//!
//! drop(aggregator);
//! assert_eq!(recorder.entries_count(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod core;
pub mod metrics;
pub mod sampling;
pub mod sink;

// Re-export core types for convenience
pub use crate::core::{Config, Result, UkmError};
pub use crate::metrics::{FrameUkmAggregator, SlotId, SlotTable};
pub use crate::sink::{MetricsSink, SourceId};

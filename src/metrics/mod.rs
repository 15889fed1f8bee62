//! Frame timing aggregation.
//!
//! - [`slots`]: the table of metric categories
//! - [`aggregator`]: per-frame accumulation, sampling and reporting
//! - [`timer`]: RAII timers feeding the aggregator
//! - [`bucketing`]: precision reduction for reported values

pub mod aggregator;
pub mod bucketing;
pub mod milestone;
pub mod reason;
pub(crate) mod report;
pub mod slots;
pub mod timer;
pub mod types;

pub use aggregator::FrameUkmAggregator;
pub use bucketing::{
    exponential_bucket_min, linear_bucket_min, linear_bucket_min_f64,
    semantic_duration_bucket_min, ExponentialBucketing,
};
pub use milestone::MilestoneState;
pub use reason::DocumentUpdateReason;
pub use report::{BEGIN_MAIN_FRAME_SUFFIX, IS_BEFORE_FCP_FIELD, PRIMARY_METRIC_NAME, TRACKERS_FIELD};
pub use slots::{ForcedLayoutCategory, MetricSlot, SlotId, SlotRole, SlotSpec, SlotTable};
pub use timer::{IterativeTimer, ScopedTimer};
pub use types::{ActiveFrameSequenceTrackers, BeginMainFrameMetrics, MetricRecord, Sample};

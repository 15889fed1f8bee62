//! Probabilistic decisions that bound reporting volume.
//!
//! - [`ReservoirSampler`]: which frame becomes the reported sample
//! - [`UmaThinning`]: thins histogram reports for very frequent events
//! - [`InstrumentationSubsampler`]: global overhead filter on count samples
//!
//! None of these own a random source; callers pass their RNG in so a seeded
//! aggregator is fully deterministic.

pub mod reservoir;
pub mod subsampler;
pub mod thinning;

pub use reservoir::{FrameChoice, ReservoirSampler};
pub use subsampler::InstrumentationSubsampler;
pub use thinning::UmaThinning;

//! Global filter that drops a share of instrumentation samples to keep
//! measurement overhead down.

use rand::Rng;

/// Bernoulli filter over count samples.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentationSubsampler {
    rate: f64,
}

impl InstrumentationSubsampler {
    /// Keep each sample with probability `rate`, clamped to `[0, 1]`
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }

    /// Filter that keeps everything
    pub fn disabled() -> Self {
        Self::new(1.0)
    }

    /// Whether to record the current sample
    #[inline]
    pub fn should_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }
        rng.gen::<f64>() < self.rate
    }
}

impl Default for InstrumentationSubsampler {
    fn default() -> Self {
        Self::disabled()
    }
}

//! Random thinning for high frequency histogram reports.

use rand::Rng;

/// Countdown between reports, redrawn uniformly from `[0, 2 * mean]` after
/// each report so the long run rate is one report per `mean + 1` calls.
#[derive(Debug, Clone)]
pub struct UmaThinning {
    mean_interval: u32,
    calls_until_report: u32,
}

impl UmaThinning {
    /// Create a thinning filter; the first call always reports
    pub fn new(mean_interval: u32) -> Self {
        Self {
            mean_interval,
            calls_until_report: 0,
        }
    }

    /// Whether this call should report
    pub fn should_report<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.calls_until_report == 0 {
            let upper = self.mean_interval.saturating_mul(2);
            self.calls_until_report = rng.gen_range(0..=upper);
            true
        } else {
            self.calls_until_report -= 1;
            false
        }
    }
}

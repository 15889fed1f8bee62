//! Reservoir choice of the reported frame.
//!
//! Keeps one frame out of the frames seen since the last report, each with
//! equal probability: frame `n` replaces the retained sample with
//! probability `1/n`.

use rand::Rng;

/// Test override for the next reservoir decisions. Sticky until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameChoice {
    /// Decide randomly
    #[default]
    NoPreference,
    /// Always replace the retained sample
    MustChoose,
    /// Never replace the retained sample (the first frame still is)
    MustNotChoose,
}

/// Frame counter and replacement decision since the last report.
#[derive(Debug, Default)]
pub struct ReservoirSampler {
    frames_since_last_report: u64,
    choice: FrameChoice,
}

impl ReservoirSampler {
    /// Create an empty sampler
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more frame and decide whether it becomes the sample.
    ///
    /// The first frame after a report is always chosen, regardless of any
    /// override.
    pub fn observe_frame<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.frames_since_last_report = self.frames_since_last_report.saturating_add(1);
        if self.frames_since_last_report == 1 {
            return true;
        }

        match self.choice {
            FrameChoice::MustChoose => true,
            FrameChoice::MustNotChoose => false,
            FrameChoice::NoPreference => {
                rng.gen::<f64>() < 1.0 / self.frames_since_last_report as f64
            },
        }
    }

    /// Frames observed since the last report
    pub fn frames_since_last_report(&self) -> u64 {
        self.frames_since_last_report
    }

    /// Start a new reporting interval
    pub fn reset(&mut self) {
        self.frames_since_last_report = 0;
    }

    /// Install a test override
    pub fn set_choice(&mut self, choice: FrameChoice) {
        self.choice = choice;
    }

    /// Current override
    pub fn choice(&self) -> FrameChoice {
        self.choice
    }
}

//! First contentful paint tracking.

/// Where the frame is relative to first contentful paint. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MilestoneState {
    /// Not reached yet
    #[default]
    BeforeMilestone,
    /// Reached during the frame in progress
    ReachedThisFrame,
    /// Reached in an earlier, already reported frame
    AfterMilestone,
}

impl MilestoneState {
    /// Record that the milestone was observed.
    ///
    /// Returns `true` only on the transition out of `BeforeMilestone`; later
    /// signals leave the state untouched.
    pub fn reach(&mut self) -> bool {
        if *self == MilestoneState::BeforeMilestone {
            *self = MilestoneState::ReachedThisFrame;
            true
        } else {
            false
        }
    }

    /// Close out the frame that reached the milestone.
    pub fn complete_frame(&mut self) {
        debug_assert_eq!(*self, MilestoneState::ReachedThisFrame);
        *self = MilestoneState::AfterMilestone;
    }

    /// Samples still count toward the pre-milestone aggregate
    #[inline]
    pub fn is_pre_milestone(self) -> bool {
        self != MilestoneState::AfterMilestone
    }

    /// The milestone has been observed, possibly this frame
    #[inline]
    pub fn has_reached(self) -> bool {
        self >= MilestoneState::ReachedThisFrame
    }
}

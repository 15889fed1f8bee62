//! Monotonic timestamps and the clocks that produce them.
//!
//! The aggregator never reads the system clock directly; it goes through a
//! [`TickClock`] so tests can substitute a [`ManualTickClock`] and step time
//! deterministically.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point on a monotonic time axis, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeTicks(i64);

impl TimeTicks {
    /// Creates a timestamp from raw microseconds since the clock origin
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Microseconds since the clock origin
    pub const fn as_micros(self) -> i64 {
        self.0
    }
}

/// Signed span between two [`TimeTicks`], in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeDelta(i64);

impl TimeDelta {
    /// Zero-length delta
    pub const ZERO: TimeDelta = TimeDelta(0);

    /// Creates a delta from microseconds
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Creates a delta from milliseconds
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    /// Creates a delta from seconds
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000))
    }

    /// Length in microseconds
    pub const fn in_microseconds(self) -> i64 {
        self.0
    }

    /// Length in fractional milliseconds
    pub fn in_milliseconds_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Converts to a [`Duration`], clamping negative deltas to zero
    pub fn to_duration(self) -> Duration {
        Duration::from_micros(u64::try_from(self.0).unwrap_or(0))
    }
}

impl From<Duration> for TimeDelta {
    fn from(duration: Duration) -> Self {
        Self(i64::try_from(duration.as_micros()).unwrap_or(i64::MAX))
    }
}

impl Sub for TimeTicks {
    type Output = TimeDelta;

    fn sub(self, rhs: TimeTicks) -> TimeDelta {
        TimeDelta(self.0.saturating_sub(rhs.0))
    }
}

impl Add<TimeDelta> for TimeTicks {
    type Output = TimeTicks;

    fn add(self, rhs: TimeDelta) -> TimeTicks {
        TimeTicks(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<TimeDelta> for TimeTicks {
    fn add_assign(&mut self, rhs: TimeDelta) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;

    fn add(self, rhs: TimeDelta) -> TimeDelta {
        TimeDelta(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Source of monotonic timestamps.
pub trait TickClock: Send + Sync {
    /// Current time on this clock's axis
    fn now_ticks(&self) -> TimeTicks;

    /// Whether timestamps are fine-grained enough for phase timing.
    ///
    /// Timers bound to a low-resolution clock record nothing.
    fn is_high_resolution(&self) -> bool;
}

/// Clock backed by [`std::time::Instant`].
#[derive(Debug, Clone)]
pub struct SystemTickClock {
    origin: Instant,
}

impl SystemTickClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for SystemTickClock {
    fn now_ticks(&self) -> TimeTicks {
        TimeTicks::from(self.origin.elapsed())
    }

    fn is_high_resolution(&self) -> bool {
        // Instant is backed by a high resolution counter on all supported
        // platforms.
        true
    }
}

impl From<Duration> for TimeTicks {
    fn from(elapsed: Duration) -> Self {
        TimeTicks(i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX))
    }
}

/// Hand-driven clock for deterministic tests.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the aggregator.
#[derive(Debug, Clone)]
pub struct ManualTickClock {
    now: Arc<AtomicI64>,
    high_resolution: Arc<AtomicBool>,
}

impl ManualTickClock {
    /// Create a high resolution clock at time zero
    pub fn new() -> Self {
        Self::starting_at(TimeTicks::default())
    }

    /// Create a high resolution clock at `start`
    pub fn starting_at(start: TimeTicks) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start.as_micros())),
            high_resolution: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Move time forward by `delta`
    pub fn advance(&self, delta: TimeDelta) {
        self.now.fetch_add(delta.in_microseconds(), Ordering::Relaxed);
    }

    /// Jump to an absolute time. May move backwards.
    pub fn set(&self, ticks: TimeTicks) {
        self.now.store(ticks.as_micros(), Ordering::Relaxed);
    }

    /// Toggle the reported resolution
    pub fn set_high_resolution(&self, high_resolution: bool) {
        self.high_resolution.store(high_resolution, Ordering::Relaxed);
    }
}

impl Default for ManualTickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for ManualTickClock {
    fn now_ticks(&self) -> TimeTicks {
        TimeTicks(self.now.load(Ordering::Relaxed))
    }

    fn is_high_resolution(&self) -> bool {
        self.high_resolution.load(Ordering::Relaxed)
    }
}

//! Privacy bucketing for reported values.
//!
//! Every function here maps a raw sample to the lower bound of the bucket that
//! contains it. The results are stable: bucketing an already bucketed value
//! returns it unchanged.

use serde::{Deserialize, Serialize};

/// Exponential bucketing presets with fixed spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExponentialBucketing {
    /// Spacing 2.0, used for coarse user-timing style values
    Coarse,
    /// Spacing 1.3
    Fine,
    /// Spacing 1.15, for high resolution counts
    HighResolution,
    /// Arbitrary spacing; must be finite and greater than 1.0
    Custom(f64),
}

impl ExponentialBucketing {
    /// Spacing used by [`ExponentialBucketing::Coarse`]
    pub const COARSE_SPACING: f64 = 2.0;
    /// Spacing used by [`ExponentialBucketing::Fine`]
    pub const FINE_SPACING: f64 = 1.3;
    /// Spacing used by [`ExponentialBucketing::HighResolution`]
    pub const HIGH_RESOLUTION_SPACING: f64 = 1.15;

    /// Bucket spacing factor
    pub fn spacing(self) -> f64 {
        match self {
            Self::Coarse => Self::COARSE_SPACING,
            Self::Fine => Self::FINE_SPACING,
            Self::HighResolution => Self::HIGH_RESOLUTION_SPACING,
            Self::Custom(spacing) => spacing,
        }
    }

    /// Whether the spacing can produce buckets at all
    pub fn is_valid(self) -> bool {
        let spacing = self.spacing();
        spacing.is_finite() && spacing > 1.0
    }

    /// Minimum of the bucket containing `sample`
    #[inline]
    pub fn bucket_min(self, sample: i64) -> i64 {
        exponential_bucket_min(sample, self.spacing())
    }
}

impl Default for ExponentialBucketing {
    fn default() -> Self {
        Self::Fine
    }
}

/// Lower bound of the exponentially sized bucket containing `sample`.
///
/// Returns `ceil(spacing ^ floor(log(sample) / log(spacing)))` for positive
/// samples and `0` otherwise. `spacing` must be greater than 1.0; anything
/// else yields `0`.
pub fn exponential_bucket_min(sample: i64, spacing: f64) -> i64 {
    if sample <= 0 || !spacing.is_finite() || spacing <= 1.0 {
        return 0;
    }

    let value = sample as f64;
    let mut exponent = (value.ln() / spacing.ln()).floor();
    // ln() rounding can put exact powers on the wrong side of a boundary.
    if spacing.powf(exponent + 1.0) <= value {
        exponent += 1.0;
    } else if spacing.powf(exponent) > value {
        exponent -= 1.0;
    }

    spacing.powf(exponent).ceil() as i64
}

/// Largest multiple of `bucket_size` that is `<= sample`.
///
/// Negative samples round away from zero. A non-positive `bucket_size` leaves
/// the sample unchanged.
pub fn linear_bucket_min(sample: i64, bucket_size: i64) -> i64 {
    debug_assert!(bucket_size > 0, "bucket size must be positive");
    if bucket_size <= 0 {
        return sample;
    }
    sample
        .div_euclid(bucket_size)
        .checked_mul(bucket_size)
        .unwrap_or(sample)
}

/// Floating point variant of [`linear_bucket_min`].
///
/// The sample is floored first, so the result never exceeds `sample`. NaN
/// maps to 0 and samples outside the `i64` range saturate.
pub fn linear_bucket_min_f64(sample: f64, bucket_size: i64) -> i64 {
    if sample.is_nan() {
        return 0;
    }
    let value = linear_bucket_min(sample.floor() as i64, bucket_size);
    debug_assert!(value as f64 <= sample || sample < i64::MIN as f64);
    value
}

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// (exclusive upper bound, granularity) in milliseconds.
const DURATION_RANGES: [(i64, i64); 8] = [
    (10, 1),
    (100, 10),
    (5 * MS_PER_SECOND, 100),
    (20 * MS_PER_SECOND, MS_PER_SECOND),
    (MS_PER_MINUTE, 10 * MS_PER_SECOND),
    (10 * MS_PER_MINUTE, MS_PER_MINUTE),
    (MS_PER_HOUR, 10 * MS_PER_MINUTE),
    (MS_PER_DAY, MS_PER_HOUR),
];

/// Bucket minimum for a duration in milliseconds, with precision that falls
/// off as durations grow.
///
/// Below ten milliseconds values pass through untouched. Past one day the
/// whole-day count is bucketed exponentially with spacing 2.0.
pub fn semantic_duration_bucket_min(sample_ms: i64) -> i64 {
    if sample_ms < DURATION_RANGES[0].0 {
        return sample_ms;
    }

    for (upper, granularity) in DURATION_RANGES {
        if sample_ms < upper {
            return linear_bucket_min(sample_ms, granularity);
        }
    }

    let days = sample_ms / MS_PER_DAY;
    exponential_bucket_min(days, ExponentialBucketing::COARSE_SPACING) * MS_PER_DAY
}

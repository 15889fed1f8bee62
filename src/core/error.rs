//! Error types for the crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UkmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sampling rate must be between 0.0 and 1.0, got {0}")]
    InvalidSamplingRate(f64),

    #[error("Bucket spacing must be a finite value greater than 1.0, got {0}")]
    InvalidBucketSpacing(f64),

    #[error("Slot table must define at least one slot")]
    EmptySlotTable,

    #[error("Too many metric slots: {count} defined, at most {max} supported")]
    TooManySlots { count: usize, max: usize },

    #[error("Duplicate metric slot name: {0}")]
    DuplicateSlotName(String),

    #[error("Metric slot role {role} assigned to both '{first}' and '{second}'")]
    DuplicateSlotRole {
        role: &'static str,
        first: String,
        second: String,
    },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for aggregator operations
pub type Result<T> = std::result::Result<T, UkmError>;

impl UkmError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Returns the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidSamplingRate(_) | Self::InvalidBucketSpacing(_) => "validation",
            Self::EmptySlotTable
            | Self::TooManySlots { .. }
            | Self::DuplicateSlotName(_)
            | Self::DuplicateSlotRole { .. } => "slot_table",
            Self::Parse { .. } => "serialization",
            Self::Io(_) => "io",
        }
    }
}

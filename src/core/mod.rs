//! Ambient building blocks: errors, configuration, time and logging.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, LogLevel, LoggingConfig, ReportingConfig, SamplingConfig};
pub use error::{Result, UkmError};
pub use time::{ManualTickClock, SystemTickClock, TickClock, TimeDelta, TimeTicks};

//! Configuration management for the frame aggregator.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Programmatic construction through [`ConfigBuilder`]
//! - Validation and defaults

use crate::core::{Result, UkmError};
use crate::metrics::bucketing::ExponentialBucketing;
use crate::metrics::slots::{SlotSpec, SlotTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for a frame aggregator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling configuration
    pub sampling: SamplingConfig,
    /// Reporting configuration
    pub reporting: ReportingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Slot table; `None` selects the standard table
    pub slots: Option<Vec<SlotSpec>>,
}

/// Sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Probability that a count sample is recorded at all (0.0 to 1.0)
    pub instrumentation_sample_rate: f64,
    /// Mean number of forced layouts between cumulative histogram reports
    pub forced_layout_uma_mean_interval: u32,
    /// Intersection observer histograms are emitted every Nth main frame
    pub intersection_observer_sample_period: u32,
    /// Seed for the sampling RNG; entropy when unset
    pub seed: Option<u64>,
}

/// Reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Prefix of every cumulative histogram name
    pub histogram_prefix: String,
    /// Bucketing applied to slots flagged as bucketed
    pub bucketing: ExponentialBucketing,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include span and target fields in every line
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything
    Trace,
    /// Debugging detail
    Debug,
    /// Normal operation
    Info,
    /// Recoverable problems
    Warn,
    /// Failures only
    Error,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            instrumentation_sample_rate: 1.0,
            forced_layout_uma_mean_interval: 100,
            intersection_observer_sample_period: 10,
            seed: None,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        ReportingConfig {
            histogram_prefix: "Blink".to_string(),
            bucketing: ExponentialBucketing::Fine,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = ConfigBuilder::new().from_yaml(&content)?.build()?;
        tracing::info!("Loaded aggregator configuration from {:?}", path);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let rate = self.sampling.instrumentation_sample_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(UkmError::InvalidSamplingRate(rate));
        }

        if self.sampling.forced_layout_uma_mean_interval == 0 {
            return Err(UkmError::config(
                "forced_layout_uma_mean_interval must be greater than 0",
            ));
        }

        if self.sampling.intersection_observer_sample_period == 0 {
            return Err(UkmError::config(
                "intersection_observer_sample_period must be greater than 0",
            ));
        }

        if !self.reporting.bucketing.is_valid() {
            return Err(UkmError::InvalidBucketSpacing(self.reporting.bucketing.spacing()));
        }

        if self.reporting.histogram_prefix.trim().is_empty() {
            return Err(UkmError::config("histogram_prefix must not be empty"));
        }

        self.slot_table().map(|_| ())
    }

    /// Build the slot table this configuration describes
    pub fn slot_table(&self) -> Result<SlotTable> {
        match &self.slots {
            Some(specs) => SlotTable::from_specs(specs),
            None => Ok(SlotTable::standard()),
        }
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| UkmError::parse(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the instrumentation sample rate
    pub fn instrumentation_sample_rate(mut self, rate: f64) -> Self {
        self.config.sampling.instrumentation_sample_rate = rate;
        self
    }

    /// Set the mean forced layout interval between histogram reports
    pub fn forced_layout_uma_mean_interval(mut self, calls: u32) -> Self {
        self.config.sampling.forced_layout_uma_mean_interval = calls;
        self
    }

    /// Set the intersection observer sample period
    pub fn intersection_observer_sample_period(mut self, frames: u32) -> Self {
        self.config.sampling.intersection_observer_sample_period = frames;
        self
    }

    /// Seed the sampling RNG
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.sampling.seed = Some(seed);
        self
    }

    /// Set the histogram prefix
    pub fn histogram_prefix(mut self, prefix: &str) -> Self {
        self.config.reporting.histogram_prefix = prefix.to_string();
        self
    }

    /// Set the bucketing used for bucketed slots
    pub fn bucketing(mut self, bucketing: ExponentialBucketing) -> Self {
        self.config.reporting.bucketing = bucketing;
        self
    }

    /// Replace the slot table
    pub fn slots(mut self, slots: Vec<SlotSpec>) -> Self {
        self.config.slots = Some(slots);
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

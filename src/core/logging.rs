//! Tracing subscriber setup for hosts that do not install their own.

use crate::core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber for the configured level.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` if a
/// global subscriber was already installed.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("frame_ukm={}", config.level.as_str())));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.structured {
        builder
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        builder.compact().with_target(false).try_init()
    };

    result.is_ok()
}

//! Tracing subscriber setup shared by the binaries

use crate::config::{LogLevel, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
/// Calling it twice is harmless.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { LogLevel::Debug } else { config.level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

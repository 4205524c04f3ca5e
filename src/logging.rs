//! Logging setup
//!
//! Installs a global `tracing` subscriber filtered to stratum's own targets.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{StratumError, StratumResult};
use tracing_subscriber::EnvFilter;

/// Filter directive for the configured level
fn filter_for(config: &LoggingConfig) -> StratumResult<EnvFilter> {
    EnvFilter::try_new(format!("stratum={}", config.level)).map_err(|e| {
        StratumError::Internal(format!("invalid log level {:?}: {}", config.level, e))
    })
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is kept.
pub fn init(config: &LoggingConfig) -> StratumResult<bool> {
    let filter = filter_for(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();

    let installed = match config.format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    Ok(installed)
}

//! Tracing initialisation

use tracing_subscriber::EnvFilter;
use wsb_core::{WsbError, WsbResult};

/// Logging configuration
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn filter(&self) -> WsbResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| WsbError::Config(format!("log level {:?}: {}", self.level, e))),
        }
    }
}

/// Install the global subscriber
///
/// Fails when the level is not a valid filter or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> WsbResult<()> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| WsbError::Config(format!("tracing init: {}", e)))
}

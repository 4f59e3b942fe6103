//! Logging setup: a tracing subscriber with an env filter, text or JSON
//! output, and a bridge for `log` records emitted by the storage layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Builds the filter: `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed (tests, or a
/// host application that configured its own).
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = build_filter(config);
    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    match installed {
        Ok(()) => {
            // Usually already done by `try_init`; a no-op error then.
            let _ = tracing_log::LogTracer::init();
            Ok(true)
        }
        Err(e) if e.to_string().contains("already") => Ok(false),
        Err(e) => Err(ConfigError::Logging(e.to_string())),
    }
}

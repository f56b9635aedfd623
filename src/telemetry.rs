//! Diagnostic logging setup for host processes.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` wins, then the configured level.
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install a global fmt subscriber filtered by [`env_filter`].
///
/// Library code never calls this; the host decides whether the console sink's
/// log lines and the pipeline diagnostics go to stdout.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter(config))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_fails_second_time() {
        let config = LoggingConfig::default();
        // Another test in this binary may have installed one already.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }

    #[test]
    fn test_env_filter_uses_configured_level() {
        let config = LoggingConfig {
            level: "api_hook=debug".to_string(),
            ..LoggingConfig::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(env_filter(&config).to_string().contains("api_hook=debug"));
        }
    }
}

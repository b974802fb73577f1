use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

/// Filter built from `RUST_LOG`, falling back to the configured level.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber. A subscriber that is already installed is kept.
pub fn init_logging(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(config));
    let result = match config.format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "Logging already initialized");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn configured_level_applies_without_rust_log() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = LoggingConfig {
                level: "modkit_hal=debug".to_owned(),
                format: LogFormat::Json,
            };
            assert_eq!(env_filter(&config).to_string(), "modkit_hal=debug");
        });
    }

    #[test]
    fn rust_log_wins() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            assert_eq!(env_filter(&LoggingConfig::default()).to_string(), "warn");
        });
    }

    #[test]
    fn repeated_initialization_is_harmless() {
        init_logging(&LoggingConfig::default());
        init_logging(&LoggingConfig::default());
    }
}

//! Subscriber set-up. Library crates log through both `log` and `tracing`;
//! `log` records are bridged into the tracing subscriber.

use tracing_subscriber::EnvFilter;

use ordarchive::config::{LogFormat, LoggingConfig};

use crate::error::ServeError;

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig) -> Result<(), ServeError> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ordarchive={level},ordarchive_server={level},tower_http={level},warn",
            level = config.level
        ))
    });

    let installed = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(true)
                .finish(),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .finish(),
        ),
    };
    installed?;
    Ok(())
}

//! Structured logging setup with tracing

use crate::config::{LogFormat, LoggingSettings};
use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Build the filter for `settings`; `RUST_LOG` takes precedence when set
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_directive()))
}

/// Install the global subscriber
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let subscriber = Registry::default().with(env_filter(settings));

    let installed = match settings.format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true);
            subscriber.with(json_layer).try_init()
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact();
            subscriber.with(fmt_layer).try_init()
        }
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    tracing::info!(
        "Logging initialized: level={}, format={:?}",
        settings.level.as_directive(),
        settings.format
    );
    Ok(())
}

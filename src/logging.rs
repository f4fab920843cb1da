//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install a global subscriber. `RUST_LOG` takes precedence over `config.level`.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::config(format!("invalid log filter '{}': {}", config.level, e)))?;

    let result = if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(env_filter);
        tracing_subscriber::registry().with(json_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter);
        tracing_subscriber::registry().with(fmt_layer).try_init()
    };

    result.map_err(|e| Error::config(format!("failed to install tracing subscriber: {}", e)))
}

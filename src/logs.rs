//! Logging configuration

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::errors::CorvusError;

/// Initialize the process-wide tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. The format is text for
/// local development and JSON for production log shipping.
pub fn init_logging(format: LogFormat) -> Result<(), CorvusError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| CorvusError::Config(e.to_string()))?,
        LogFormat::Text => registry
            .with(fmt::layer())
            .try_init()
            .map_err(|e| CorvusError::Config(e.to_string()))?,
    }

    Ok(())
}

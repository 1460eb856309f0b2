pub mod config;
pub mod error;

pub use config::{
    BreakerConfig, CacheConfig, CacheWritePolicy, Config, FallbackConfig, FallbackErrorPolicy,
    LoggingConfig, ValidationResult,
};
pub use error::ErrorKind;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over the configured filter; an empty or unparsable filter
/// falls back to `info`.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let configured = match logging.filter.trim() {
        "" => "info",
        directive => directive,
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Stratus core initialized");
    Ok(())
}

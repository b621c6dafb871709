//! Logging for the Waymark router server.
//!
//! Sets up a `tracing` subscriber that writes either flattened JSON lines
//! (the default) or human-readable output, and names the events the server
//! emits so log consumers can key on a stable `event` field.
//!
//! ```ignore
//! use waymark_telemetry::{LogFormat, TelemetryConfig};
//!
//! waymark_telemetry::init(
//!     TelemetryConfig::new()
//!         .with_log_level("debug")
//!         .with_log_format(LogFormat::Pretty),
//! )?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::events;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or the filter was invalid.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init(config: TelemetryConfig) -> Result<TelemetryConfig, TelemetryError> {
    logging::init_logging(&config)?;
    Ok(config)
}

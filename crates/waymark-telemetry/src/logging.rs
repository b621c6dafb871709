//! Subscriber setup and standard event names.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// Fails when the level is not a valid filter directive or when a
/// subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.log_level)?,
    };

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level)
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log level '{level}': {e}")))
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Values of the `event` field.
pub mod events {
    pub const STARTUP: &str = "startup";

    pub const SHUTDOWN: &str = "shutdown";

    /// The route manifest was loaded and compiled.
    pub const ROUTES_LOADED: &str = "routes_loaded";

    pub const LISTENING: &str = "listening";

    pub const REQUEST_COMPLETED: &str = "request_completed";

    /// A route matched the path but not the method; a 405 was sent.
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";

    /// The matched handler could not be resolved or run.
    pub const DISPATCH_ERROR: &str = "dispatch_error";
}

/// Log a startup event.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::STARTUP, $($field)*)
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::SHUTDOWN, $($field)*)
    };
}

#[macro_export]
macro_rules! log_routes_loaded {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::ROUTES_LOADED, $($field)*)
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::LISTENING, $($field)*)
    };
}

#[macro_export]
macro_rules! log_request_completed {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::REQUEST_COMPLETED, $($field)*)
    };
}

#[macro_export]
macro_rules! log_method_not_allowed {
    ($($field:tt)*) => {
        tracing::warn!(event = $crate::logging::events::METHOD_NOT_ALLOWED, $($field)*)
    };
}

#[macro_export]
macro_rules! log_dispatch_error {
    ($($field:tt)*) => {
        tracing::error!(event = $crate::logging::events::DISPATCH_ERROR, $($field)*)
    };
}

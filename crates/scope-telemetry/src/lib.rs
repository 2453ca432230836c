//! # Scope Telemetry
//!
//! Logging bootstrap for processes embedding the scope registry. The
//! registry itself only emits `tracing` events; this crate installs the
//! subscriber that prints them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scope_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Registry events are now printed
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SCOPE_REGISTRY_SERVICE_NAME` | `scope-registry` | Service span name |
//! | `SCOPE_REGISTRY_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `SCOPE_REGISTRY_CONSOLE_OUTPUT` | `true` | Print to stdout |
//! | `SCOPE_REGISTRY_JSON_LOGS` | `false` | JSON log lines |

mod config;
mod logging;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter `{directive}`: {reason}")]
    Filter { directive: String, reason: String },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Initialize logging.
///
/// Returns a guard that must be held for the lifetime of the application.
/// Fails if another global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing_guard = tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
        _tracing: tracing_guard,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _tracing: TracingGuard,
}

impl TelemetryGuard {
    /// Service name the guard was created for.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for creating a span scoped to one container.
///
/// # Example
///
/// ```rust,ignore
/// use scope_telemetry::container_span;
///
/// let _span = container_span!("request", container = %child.id()).entered();
/// ```
#[macro_export]
macro_rules! container_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

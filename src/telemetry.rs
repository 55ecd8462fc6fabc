//! `tracing` subscriber set-up.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

/// Error raised when the global subscriber cannot be installed.
#[derive(Debug, Error)]
#[error("failed to initialise tracing: {0}")]
pub struct TelemetryError(String);

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// When `RUST_LOG` is unset or unparseable `default_directive` is used
/// instead. Logs go to stderr.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the directive is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| TelemetryError(err.to_string()))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError(err.to_string()))
}

//! Error types for maker-telemetry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;

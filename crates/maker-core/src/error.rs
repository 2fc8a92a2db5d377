//! Error types for maker-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid bar at {timestamp_ms}: {detail}")]
    InvalidBar { timestamp_ms: i64, detail: String },

    #[error("unknown market: {0}")]
    UnknownMarket(u32),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

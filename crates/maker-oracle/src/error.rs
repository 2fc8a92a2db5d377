//! Error types for maker-oracle.

use thiserror::Error;

/// Per-source fetch failures. Swallowed during aggregation; only a full
/// blackout is visible to callers, as a `None` price.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected payload from {exchange}: {detail}")]
    BadPayload {
        exchange: &'static str,
        detail: String,
    },

    #[error("invalid oracle configuration: {0}")]
    InvalidConfig(String),
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

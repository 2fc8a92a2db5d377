//! Error types for maker-engine.

use thiserror::Error;

/// Fatal engine failures. Cycle-level conditions (risk denials, unhealthy
/// books, size rejections, per-order venue errors) are logged inside the
/// loop and never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Venue(#[from] maker_venue::VenueError),

    #[error("no markets to quote after filtering")]
    NoMarkets,

    #[error("engine not started")]
    NotStarted,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

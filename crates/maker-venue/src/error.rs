//! Error types for maker-venue.

use thiserror::Error;

/// Venue SDK failures. Inside the quote loop these abandon the individual
/// call and are logged; at startup they are fatal.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("venue rejected request: {0}")]
    Rejected(String),

    #[error("unexpected venue payload: {0}")]
    BadPayload(String),

    #[error("venue request timed out")]
    Timeout,

    #[error("orderbook event stream already taken")]
    EventsAlreadyTaken,

    #[error("venue connection closed")]
    Closed,
}

pub type VenueResult<T> = std::result::Result<T, VenueError>;

//! Venue access for the quoting engine.
//!
//! The engine only sees the [`VenueClient`] trait; the venue owns
//! authoritative order state. Two implementations ship here:
//! - [`paper::PaperVenue`]: in-process venue for tests and dry runs
//! - [`ws::WsVenue`]: thin JSON-over-websocket adapter for a live venue

pub mod client;
pub mod error;
pub mod paper;
pub mod ws;

pub use client::{BoxFuture, VenueClient};
pub use error::{VenueError, VenueResult};
pub use paper::PaperVenue;
pub use ws::WsVenue;

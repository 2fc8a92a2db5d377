//! Live quoting loop.
//!
//! One engine instance drives every subscribed market of a process: each
//! orderbook event runs the decision pipeline (health → risk → reference
//! price → spread → shaping → requote gate → sizing → placement), a
//! periodic tick keeps account state fresh between events, and shutdown
//! cancels everything resting at the venue.

pub mod engine;
pub mod error;
pub mod hedge;

pub use engine::{LastQuotePrices, QuoteEngine, QuotePhase};
pub use error::{EngineError, EngineResult};
pub use hedge::HedgeExecutor;

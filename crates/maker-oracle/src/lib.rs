//! Multi-source reference-price oracle.
//!
//! Queries the configured ticker sources concurrently, aggregates the
//! successes by per-field lower median, and caches the result per symbol
//! with a TTL. A full blackout falls back to the stale cache entry when one
//! exists; otherwise the caller decides (orderbook mid or skip).

pub mod config;
pub mod error;
pub mod oracle;
pub mod sources;

pub use config::{OracleConfig, SourceKind};
pub use error::{OracleError, OracleResult};
pub use oracle::{ExchangePrice, PriceOracle};

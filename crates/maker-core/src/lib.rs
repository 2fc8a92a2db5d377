//! Core domain types for the perpmaker quoting engine.
//!
//! This crate provides the fundamental types shared across the system:
//! - `Price`, `Size`: typed f64 wrappers with explicit tick/step rounding
//! - `MarketId`, `Market`: market identity and static specification
//! - `OrderbookSnapshot`: depth snapshot with ordering invariants
//! - `Position`, `Balance`, `AccountView`: account state
//! - `OrderIntent`, `RestingOrder`, `QuoteLadder`: order lifecycle types
//! - `HistoricalBar`: one bar of OHLCV + depth data

pub mod account;
pub mod bar;
pub mod book;
pub mod error;
pub mod market;
pub mod num;
pub mod order;

pub use account::{AccountView, Balance, Position};
pub use bar::{HistoricalBar, DEFAULT_BAR_DEPTH};
pub use book::{BookLevel, OrderbookSnapshot};
pub use error::{CoreError, Result};
pub use market::{Market, MarketId};
pub use num::{Price, Size};
pub use order::{FillMode, OrderId, OrderIntent, QuoteLadder, QuoteLevel, RestingOrder, Side};

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

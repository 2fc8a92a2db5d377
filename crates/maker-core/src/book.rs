//! Orderbook snapshots.
//!
//! A snapshot carries the depth visible at one instant: bids sorted by
//! price descending, asks ascending. A non-empty book must not be crossed
//! (`best_bid < best_ask`); crossed or one-sided books are surfaced by the
//! health check, not hidden here.

use crate::{MarketId, Price, Size};
use serde::{Deserialize, Serialize};

/// One resting depth level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self {
            price: Price::new(price),
            size: Size::new(size),
        }
    }
}

/// Point-in-time orderbook state for one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub market: MarketId,
    pub timestamp_ms: i64,
    /// Bid levels, best (highest price) first.
    pub bids: Vec<BookLevel>,
    /// Ask levels, best (lowest price) first.
    pub asks: Vec<BookLevel>,
}

impl OrderbookSnapshot {
    pub fn new(market: MarketId, timestamp_ms: i64) -> Self {
        Self {
            market,
            timestamp_ms,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Arithmetic mid of the top of book. `None` when either side is empty.
    pub fn mid(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(Price::new((bid.price.inner() + ask.price.inner()) / 2.0))
    }

    /// Fractional top-of-book spread `(ask - bid) / mid`.
    pub fn top_spread(&self) -> Option<f64> {
        let bid = self.best_bid()?.price.inner();
        let ask = self.best_ask()?.price.inner();
        let mid = (bid + ask) / 2.0;
        if mid == 0.0 {
            return None;
        }
        Some((ask - bid) / mid)
    }
}

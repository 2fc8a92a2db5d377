//! Depth-imbalance spread and book health.
//!
//! The target spread widens linearly with the absolute depth imbalance over
//! the top `depth_levels` of each side: a one-sided book quotes at
//! `spread.max`, a balanced book at `spread.min`.

use crate::config::SpreadConfig;
use maker_core::{OrderbookSnapshot, Price};
use thiserror::Error;

/// Top-of-book spread above which the book is considered broken.
const MAX_TOP_SPREAD: f64 = 0.05;

/// Minimum levels each side must show before we quote against the book.
const MIN_BOOK_LEVELS: usize = 2;

/// Why a book failed the health check. Suppresses one quote cycle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BookHealth {
    #[error("book too shallow: {bids} bid / {asks} ask levels")]
    TooShallow { bids: usize, asks: usize },

    #[error("no mid price: one side of the book is empty")]
    NoMid,

    #[error("top-of-book spread {spread:.4} above {MAX_TOP_SPREAD}")]
    SpreadTooWide { spread: f64 },
}

/// Output of the spread computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSpread {
    /// Target fractional spread, clamped to `[min, max]`.
    pub spread: f64,
    /// `(B - A) / (B + A)` over the depth window; positive means bid-heavy.
    pub imbalance: f64,
    /// Summed bid size over the window.
    pub bid_depth: f64,
    /// Summed ask size over the window.
    pub ask_depth: f64,
}

/// Maps orderbook depth to a target spread; owns the health check.
#[derive(Debug, Clone)]
pub struct SpreadEngine {
    config: SpreadConfig,
}

impl SpreadEngine {
    pub fn new(config: SpreadConfig) -> Self {
        Self { config }
    }

    /// Compute the depth-weighted target spread for `book`.
    pub fn dynamic_spread(&self, book: &OrderbookSnapshot) -> DepthSpread {
        let depth = self
            .config
            .depth_levels
            .min(book.bids.len())
            .min(book.asks.len());

        let bid_depth: f64 = book.bids[..depth].iter().map(|l| l.size.inner()).sum();
        let ask_depth: f64 = book.asks[..depth].iter().map(|l| l.size.inner()).sum();

        let total = bid_depth + ask_depth;
        let imbalance = if total == 0.0 {
            0.0
        } else {
            (bid_depth - ask_depth) / total
        };

        let raw = self.config.min + imbalance.abs() * (self.config.max - self.config.min);
        let spread = raw.clamp(self.config.min, self.config.max);

        DepthSpread {
            spread,
            imbalance,
            bid_depth,
            ask_depth,
        }
    }

    /// Mid of the top of book; `None` when either side is empty.
    pub fn mid(&self, book: &OrderbookSnapshot) -> Option<Price> {
        book.mid()
    }

    /// A book is quotable when both sides carry at least two levels, a mid
    /// exists, and the top-of-book spread is at most 5%.
    pub fn health(&self, book: &OrderbookSnapshot) -> Result<(), BookHealth> {
        if book.bids.len() < MIN_BOOK_LEVELS || book.asks.len() < MIN_BOOK_LEVELS {
            return Err(BookHealth::TooShallow {
                bids: book.bids.len(),
                asks: book.asks.len(),
            });
        }
        let spread = book.top_spread().ok_or(BookHealth::NoMid)?;
        if spread > MAX_TOP_SPREAD {
            return Err(BookHealth::SpreadTooWide { spread });
        }
        Ok(())
    }
}

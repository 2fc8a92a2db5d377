//! Order lifecycle types.

use crate::{MarketId, Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }

    /// +1 for bid (buys add to position), -1 for ask.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Bid => 1.0,
            Self::Ask => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "bid"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// How an order interacts with the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    Limit,
    Market,
    Ioc,
    Fok,
}

/// Venue-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request to place one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub market: MarketId,
    pub side: Side,
    /// Absent for market orders.
    pub price: Option<Price>,
    pub size: Size,
    pub fill_mode: FillMode,
    pub reduce_only: bool,
}

impl OrderIntent {
    /// A plain resting limit order.
    pub fn limit(market: MarketId, side: Side, price: Price, size: Size) -> Self {
        Self {
            market,
            side,
            price: Some(price),
            size,
            fill_mode: FillMode::Limit,
            reduce_only: false,
        }
    }

    /// A reduce-only market order (hedging).
    pub fn reduce_only_market(market: MarketId, side: Side, size: Size) -> Self {
        Self {
            market,
            side,
            price: None,
            size,
            fill_mode: FillMode::Market,
            reduce_only: true,
        }
    }
}

/// An order resting at the venue (or in the backtest's local book).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: OrderId,
    pub market: MarketId,
    pub side: Side,
    pub price: Price,
    pub size: Size,
    pub reduce_only: bool,
    pub placed_at_ms: i64,
    /// Set by the backtest fill sweep; live fills are venue-authoritative.
    pub filled: bool,
    pub filled_at_ms: Option<i64>,
}

impl RestingOrder {
    pub fn from_intent(id: OrderId, intent: &OrderIntent, placed_at_ms: i64) -> Self {
        Self {
            id,
            market: intent.market,
            side: intent.side,
            price: intent.price.unwrap_or(Price::ZERO),
            size: intent.size,
            reduce_only: intent.reduce_only,
            placed_at_ms,
            filled: false,
            filled_at_ms: None,
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.placed_at_ms)
    }
}

/// One price/size rung of a quote ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteLevel {
    pub price: Price,
    pub size: Size,
}

/// The full two-sided ladder the engine believes is resting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLadder {
    pub market: MarketId,
    /// Bid levels, best first.
    pub bids: Vec<QuoteLevel>,
    /// Ask levels, best first.
    pub asks: Vec<QuoteLevel>,
    pub generated_at_ms: i64,
}

impl QuoteLadder {
    pub fn level_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite_and_sign() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
        assert_eq!(Side::Bid.sign(), 1.0);
        assert_eq!(Side::Ask.sign(), -1.0);
    }

    #[test]
    fn test_reduce_only_market_intent() {
        let intent = OrderIntent::reduce_only_market(MarketId::new(3), Side::Ask, Size::new(0.3));
        assert!(intent.reduce_only);
        assert!(intent.price.is_none());
        assert_eq!(intent.fill_mode, FillMode::Market);
    }

    #[test]
    fn test_resting_order_age() {
        let intent = OrderIntent::limit(
            MarketId::new(0),
            Side::Bid,
            Price::new(99.9),
            Size::new(1.0),
        );
        let order = RestingOrder::from_intent(OrderId(7), &intent, 1_000);
        assert_eq!(order.age_ms(61_500), 60_500);
        assert!(!order.filled);
    }
}

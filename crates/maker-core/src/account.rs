//! Account state: balances, positions, and the view the risk gate consumes.

use crate::{MarketId, Price};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signed position in one market. Positive size is long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub market: MarketId,
    /// Base units; sign carries direction.
    pub size: f64,
    /// Meaningless while `size == 0`.
    pub entry_price: Price,
    pub unrealized_pnl: f64,
}

impl Position {
    pub fn flat(market: MarketId) -> Self {
        Self {
            market,
            size: 0.0,
            entry_price: Price::ZERO,
            unrealized_pnl: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    /// Absolute notional at the position's entry price.
    pub fn entry_notional(&self) -> f64 {
        (self.size * self.entry_price.inner()).abs()
    }
}

/// Collateral balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub total: f64,
    /// Free collateral; `0 <= available <= total`.
    pub available: f64,
}

impl Balance {
    pub fn new(total: f64, available: f64) -> Self {
        Self { total, available }
    }
}

/// Snapshot of account state the decision pipeline reads.
///
/// Refreshed from the venue on the periodic safety tick; treated as
/// read-only by every component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountView {
    pub balance: Balance,
    pub positions: HashMap<MarketId, Position>,
    /// Venue-reported margin fraction (leverage endpoint).
    pub margin_fraction: f64,
}

impl Default for Balance {
    fn default() -> Self {
        Self {
            total: 0.0,
            available: 0.0,
        }
    }
}

impl AccountView {
    pub fn position(&self, market: MarketId) -> Option<&Position> {
        self.positions.get(&market)
    }

    /// Sum of |size * entry| over all open positions.
    pub fn gross_notional(&self) -> f64 {
        self.positions.values().map(Position::entry_notional).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_notional_uses_absolute_size() {
        let pos = Position {
            market: MarketId::new(0),
            size: -2.0,
            entry_price: Price::new(50.0),
            unrealized_pnl: 0.0,
        };
        assert_eq!(pos.entry_notional(), 100.0);
    }

    #[test]
    fn test_gross_notional_sums_markets() {
        let mut view = AccountView::default();
        view.positions.insert(
            MarketId::new(0),
            Position {
                market: MarketId::new(0),
                size: 1.0,
                entry_price: Price::new(100.0),
                unrealized_pnl: 0.0,
            },
        );
        view.positions.insert(
            MarketId::new(1),
            Position {
                market: MarketId::new(1),
                size: -0.5,
                entry_price: Price::new(200.0),
                unrealized_pnl: 0.0,
            },
        );
        assert_eq!(view.gross_notional(), 200.0);
    }
}

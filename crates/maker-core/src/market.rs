//! Market identity and static specification.

use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Venue-assigned market index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub u32);

impl MarketId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static market specification. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    /// Venue symbol, e.g. "SOL-PERP".
    pub symbol: String,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum order size in base units.
    pub min_size: Size,
    /// Maximum leverage offered by the venue.
    pub max_leverage: f64,
}

impl Market {
    /// Base symbol with the perp suffix stripped, e.g. "SOL-PERP" → "SOL".
    ///
    /// This is the symbol external ticker sources are keyed by.
    pub fn base_symbol(&self) -> &str {
        self.symbol.strip_suffix("-PERP").unwrap_or(&self.symbol)
    }
}

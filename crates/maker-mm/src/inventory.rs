//! Inventory skew and per-market bias.
//!
//! The shaper shifts both quotes against the current position so fills that
//! reduce inventory become more likely. Sign convention: a long position (or
//! positive bias) raises both quotes, encouraging sells; a short lowers both.
//!
//! The two branches intentionally apply bias differently and must stay that
//! way: with skew disabled the bias is added inside the half-spread terms,
//! with skew enabled it multiplies the base price together with the skew.

use crate::config::MakerConfig;
use maker_core::{AccountView, MarketId, Price};
use maker_risk::RiskGate;

/// Position ratios inside this dead zone produce no skew.
const SKEW_DEAD_ZONE: f64 = 0.05;

/// Fraction of the open position offloaded by one hedge order.
pub const HEDGE_RATIO: f64 = 0.3;

/// Shaped quote prices plus the inputs that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedQuote {
    pub bid_price: Price,
    pub ask_price: Price,
    pub skew_factor: f64,
    pub bias: f64,
    pub position_ratio: f64,
}

/// Combines position skew and static bias into quote prices.
#[derive(Debug, Clone)]
pub struct InventoryShaper {
    config: MakerConfig,
}

impl InventoryShaper {
    pub fn new(config: MakerConfig) -> Self {
        Self { config }
    }

    /// Shape bid/ask prices around `base_price` with the target `spread`.
    pub fn shape(
        &self,
        gate: &RiskGate,
        account: &AccountView,
        market: MarketId,
        base_price: Price,
        spread: f64,
    ) -> ShapedQuote {
        let bias = self.config.bias_for(market.index());
        let half = spread / 2.0;
        let base = base_price.inner();

        if !self.config.inventory_skew_enabled {
            return ShapedQuote {
                bid_price: Price::new(base * (1.0 - half + bias)),
                ask_price: Price::new(base * (1.0 + half + bias)),
                skew_factor: 0.0,
                bias,
                position_ratio: 0.0,
            };
        }

        let ratio = gate.position_ratio(account, market, base_price);
        let skew_factor = if ratio.abs() > SKEW_DEAD_ZONE {
            ratio * self.config.inventory_skew_factor
        } else {
            0.0
        };

        let adjusted = base * (1.0 + skew_factor + bias);
        ShapedQuote {
            bid_price: Price::new(adjusted * (1.0 - half)),
            ask_price: Price::new(adjusted * (1.0 + half)),
            skew_factor,
            bias,
            position_ratio: ratio,
        }
    }

    /// Whether the position imbalance warrants a hedge at `mid`.
    pub fn needs_hedge(
        &self,
        gate: &RiskGate,
        account: &AccountView,
        market: MarketId,
        mid: Price,
    ) -> bool {
        if !self.config.auto_hedge.enabled {
            return false;
        }
        let ratio = gate.position_ratio(account, market, mid);
        ratio.abs() > self.config.auto_hedge.imbalance_threshold
    }
}

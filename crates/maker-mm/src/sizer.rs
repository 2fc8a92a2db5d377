//! Per-level size ladder.
//!
//! The sizer never sees the book; it turns the account's free collateral
//! into `max_levels` sizes under the configured mode. Tick/step rounding is
//! left to the engine at emission time.

use crate::config::{MakerConfig, QuantityMode};
use maker_core::{AccountView, Price, Size};
use maker_risk::RiskConfig;
use thiserror::Error;

/// Why a ladder was rejected. Suppresses one quote cycle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SizeError {
    #[error("no sizes: available collateral is zero")]
    NoSizes,

    #[error("ladder notional {notional:.2} exceeds per-side cap {cap:.2}")]
    NotionalCap { notional: f64, cap: f64 },
}

/// Produces the per-level size ladder.
#[derive(Debug, Clone)]
pub struct Sizer {
    config: MakerConfig,
    risk: RiskConfig,
}

impl Sizer {
    pub fn new(config: MakerConfig, risk: RiskConfig) -> Self {
        Self { config, risk }
    }

    /// Ordered list of `max_levels` sizes, or empty when there is no free
    /// collateral to quote with.
    pub fn level_sizes(&self, account: &AccountView) -> Vec<Size> {
        let available = account.balance.available;
        if available == 0.0 {
            return Vec::new();
        }

        (0..self.config.max_levels)
            .map(|level| {
                let raw = match self.config.quantity_mode {
                    QuantityMode::Fixed => self.config.fixed_size,
                    QuantityMode::Percentage => available * self.config.percent_per_level,
                    QuantityMode::Tiered => {
                        // Multipliers past the configured list size to zero.
                        let multiplier = self
                            .config
                            .tiered_multipliers
                            .get(level)
                            .copied()
                            .unwrap_or(0.0);
                        available * self.risk.max_exposure_per_market * multiplier
                    }
                };
                Size::new(raw)
            })
            .collect()
    }

    /// Reject ladders whose total notional would exceed the per-side cap.
    pub fn validate_sizes(
        &self,
        levels: &[Size],
        account: &AccountView,
        mid: Price,
    ) -> Result<(), SizeError> {
        if levels.is_empty() {
            return Err(SizeError::NoSizes);
        }
        let notional: f64 = levels.iter().map(|s| s.notional(mid)).sum();
        let cap = account.balance.available * self.risk.max_exposure_per_side;
        if notional > cap {
            return Err(SizeError::NotionalCap { notional, cap });
        }
        Ok(())
    }
}

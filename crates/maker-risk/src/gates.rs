//! Exposure checks and position ratio derivation.
//!
//! Check order matters: margin health first, then free collateral, then
//! per-market exposure, then portfolio exposure. The first failing check
//! denies the cycle; later checks are not evaluated.

use maker_core::{AccountView, MarketId, Price};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Risk limits. All exposure limits are fractions of collateral; the
/// free-collateral floor is absolute, in quote-currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Minimum venue margin fraction required to quote. Must be in (0, 1).
    pub min_margin_fraction: f64,
    /// Cap on one side's total quoted notional, as a fraction of available.
    pub max_exposure_per_side: f64,
    /// Cap on a single market's position notional, as a fraction of available.
    pub max_exposure_per_market: f64,
    /// Cap on gross position notional across markets, as a fraction of total.
    pub max_total_exposure: f64,
    /// Absolute free-collateral floor.
    pub min_free_collateral: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_margin_fraction: 0.05,
            max_exposure_per_side: 0.5,
            max_exposure_per_market: 0.2,
            max_total_exposure: 0.8,
            min_free_collateral: 10.0,
        }
    }
}

impl RiskConfig {
    /// Validate field ranges; returns the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_margin_fraction > 0.0 && self.min_margin_fraction < 1.0) {
            return Err(format!(
                "risk.min_margin_fraction must be in (0, 1), got {}",
                self.min_margin_fraction
            ));
        }
        if self.max_exposure_per_side <= 0.0 {
            return Err("risk.max_exposure_per_side must be positive".to_string());
        }
        if self.max_exposure_per_market <= 0.0 {
            return Err("risk.max_exposure_per_market must be positive".to_string());
        }
        if self.max_total_exposure <= 0.0 {
            return Err("risk.max_total_exposure must be positive".to_string());
        }
        if self.min_free_collateral < 0.0 {
            return Err("risk.min_free_collateral must not be negative".to_string());
        }
        Ok(())
    }
}

/// Structured denial from the gate. Suppresses one quote cycle, never fatal.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{reason}: {detail}")]
pub struct RiskDenial {
    pub reason: &'static str,
    pub detail: String,
}

/// The pre-quote risk gate.
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskConfig,
}

impl RiskGate {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Run the four ordered checks for `market` against `account`.
    pub fn can_quote(&self, account: &AccountView, market: MarketId) -> Result<(), RiskDenial> {
        let cfg = &self.config;

        if account.margin_fraction < cfg.min_margin_fraction {
            return Err(RiskDenial {
                reason: "Margin fraction too low",
                detail: format!(
                    "margin_fraction={} < min={}",
                    account.margin_fraction, cfg.min_margin_fraction
                ),
            });
        }

        let available = account.balance.available;
        if available < cfg.min_free_collateral {
            return Err(RiskDenial {
                reason: "Insufficient free collateral",
                detail: format!("available={} < min={}", available, cfg.min_free_collateral),
            });
        }

        let market_notional = account
            .position(market)
            .map(|p| p.entry_notional())
            .unwrap_or(0.0);
        let market_cap = available * cfg.max_exposure_per_market;
        if market_notional > market_cap {
            return Err(RiskDenial {
                reason: "Market exposure limit exceeded",
                detail: format!(
                    "market={market} notional={market_notional} > cap={market_cap}"
                ),
            });
        }

        let total = account.balance.total;
        let total_ratio = if total == 0.0 {
            0.0
        } else {
            account.gross_notional() / total
        };
        if total_ratio > cfg.max_total_exposure {
            return Err(RiskDenial {
                reason: "Total exposure limit exceeded",
                detail: format!(
                    "gross/total={total_ratio} > max={}",
                    cfg.max_total_exposure
                ),
            });
        }

        debug!(market = %market, "risk gate passed");
        Ok(())
    }

    /// Signed position exposure as a fraction of the per-market budget:
    /// `(size * reference) / (available * max_exposure_per_market)`.
    ///
    /// Zero when there is no position, no free collateral, or no budget.
    pub fn position_ratio(
        &self,
        account: &AccountView,
        market: MarketId,
        reference: Price,
    ) -> f64 {
        let position = match account.position(market) {
            Some(p) if !p.is_flat() => p,
            _ => return 0.0,
        };
        let budget = account.balance.available * self.config.max_exposure_per_market;
        if budget == 0.0 {
            return 0.0;
        }
        position.size * reference.inner() / budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maker_core::{Balance, Position};

    fn account(margin: f64, total: f64, available: f64) -> AccountView {
        AccountView {
            balance: Balance::new(total, available),
            positions: Default::default(),
            margin_fraction: margin,
        }
    }

    fn with_position(mut view: AccountView, market: u32, size: f64, entry: f64) -> AccountView {
        let id = MarketId::new(market);
        view.positions.insert(
            id,
            Position {
                market: id,
                size,
                entry_price: Price::new(entry),
                unrealized_pnl: 0.0,
            },
        );
        view
    }

    fn gate() -> RiskGate {
        RiskGate::new(RiskConfig {
            min_margin_fraction: 0.18,
            max_exposure_per_side: 0.5,
            max_exposure_per_market: 0.2,
            max_total_exposure: 0.8,
            min_free_collateral: 100.0,
        })
    }

    #[test]
    fn test_margin_check_denies_first() {
        // Leverage endpoint reports 0.1 against a 0.18 floor.
        let account = account(0.1, 10_000.0, 5_000.0);
        let denial = gate().can_quote(&account, MarketId::new(0)).unwrap_err();
        assert_eq!(denial.reason, "Margin fraction too low");
    }

    #[test]
    fn test_free_collateral_floor() {
        let account = account(0.5, 10_000.0, 50.0);
        let denial = gate().can_quote(&account, MarketId::new(0)).unwrap_err();
        assert_eq!(denial.reason, "Insufficient free collateral");
    }

    #[test]
    fn test_market_exposure_cap() {
        // cap = 5000 * 0.2 = 1000; notional = 11 * 100 = 1100
        let account = with_position(account(0.5, 10_000.0, 5_000.0), 0, 11.0, 100.0);
        let denial = gate().can_quote(&account, MarketId::new(0)).unwrap_err();
        assert_eq!(denial.reason, "Market exposure limit exceeded");
    }

    #[test]
    fn test_total_exposure_cap() {
        // Two markets, 900 notional each within the 1000 per-market cap,
        // but gross/total = 1800/2000 = 0.9 > 0.8.
        let account = with_position(
            with_position(account(0.5, 2_000.0, 5_000.0), 0, 9.0, 100.0),
            1,
            -9.0,
            100.0,
        );
        let denial = gate().can_quote(&account, MarketId::new(0)).unwrap_err();
        assert_eq!(denial.reason, "Total exposure limit exceeded");
    }

    #[test]
    fn test_all_checks_pass() {
        let account = with_position(account(0.5, 10_000.0, 5_000.0), 0, 1.0, 100.0);
        assert!(gate().can_quote(&account, MarketId::new(0)).is_ok());
    }

    #[test]
    fn test_position_ratio_sign_follows_position() {
        let long = with_position(account(0.5, 10_000.0, 5_000.0), 0, 2.0, 100.0);
        let short = with_position(account(0.5, 10_000.0, 5_000.0), 0, -2.0, 100.0);
        let reference = Price::new(100.0);
        // budget = 5000 * 0.2 = 1000; ratio = 200 / 1000 = 0.2
        let r_long = gate().position_ratio(&long, MarketId::new(0), reference);
        let r_short = gate().position_ratio(&short, MarketId::new(0), reference);
        assert!((r_long - 0.2).abs() < 1e-12);
        assert!((r_short + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_position_ratio_zero_guards() {
        let gate = gate();
        let reference = Price::new(100.0);

        // No position.
        let flat = account(0.5, 10_000.0, 5_000.0);
        assert_eq!(gate.position_ratio(&flat, MarketId::new(0), reference), 0.0);

        // Zero available collateral.
        let broke = with_position(account(0.5, 10_000.0, 0.0), 0, 2.0, 100.0);
        assert_eq!(gate.position_ratio(&broke, MarketId::new(0), reference), 0.0);
    }

    #[test]
    fn test_config_validation_reports_first_violation() {
        let bad = RiskConfig {
            min_margin_fraction: 1.5,
            ..RiskConfig::default()
        };
        let msg = bad.validate().unwrap_err();
        assert!(msg.contains("min_margin_fraction"));
    }
}

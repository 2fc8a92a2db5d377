//! Maker configuration: sizing, spread, skew, requote, hedge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tolerance around 1.0 for the tiered multiplier sum.
const TIERED_SUM_TOLERANCE: f64 = 0.01;

/// Sizing strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityMode {
    /// Every level quotes `fixed_size` base units.
    #[default]
    Fixed,
    /// Every level quotes `percent_per_level` of available collateral.
    Percentage,
    /// Level i quotes `available * max_exposure_per_market * tiered_multipliers[i]`.
    Tiered,
}

/// Spread bounds and the depth window used for imbalance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadConfig {
    /// Tightest spread, as a fraction of price.
    pub min: f64,
    /// Widest spread, as a fraction of price.
    pub max: f64,
    /// Number of levels per side summed for the imbalance signal.
    pub depth_levels: usize,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            min: 0.0015,
            max: 0.0125,
            depth_levels: 5,
        }
    }
}

/// Auto-hedge trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    pub enabled: bool,
    /// `|position_ratio|` above which a hedge is emitted. Must be in (0, 1).
    pub imbalance_threshold: f64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            imbalance_threshold: 0.5,
        }
    }
}

/// Per-market quoting parameters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AssetParams {
    /// Static fractional shift added to quoted prices. Must be in [-0.01, 0.01].
    pub bias: f64,
}

/// All quoting parameters. Validated once at boot, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakerConfig {
    #[serde(default)]
    pub quantity_mode: QuantityMode,
    /// Base units per level in fixed mode.
    #[serde(default = "default_fixed_size")]
    pub fixed_size: f64,
    /// Fraction of available collateral per level in percentage mode.
    #[serde(default = "default_percent_per_level")]
    pub percent_per_level: f64,
    /// Size fractions per level in tiered mode; must cover `max_levels`
    /// entries and sum to 1.0 within a 0.01 tolerance.
    #[serde(default)]
    pub tiered_multipliers: Vec<f64>,
    #[serde(default)]
    pub spread: SpreadConfig,
    /// Ladder depth per side. Must be in [1, 10].
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    /// Minimum fractional move of either target price that justifies
    /// cancelling and replacing resting quotes. Must be in [0, 0.01].
    #[serde(default = "default_requote_threshold")]
    pub requote_threshold: f64,
    /// Periodic account-refresh tick.
    #[serde(default = "default_requote_interval_ms")]
    pub requote_interval_ms: u64,
    #[serde(default)]
    pub inventory_skew_enabled: bool,
    /// Scales position ratio into a price shift when skew is enabled.
    #[serde(default = "default_skew_factor")]
    pub inventory_skew_factor: f64,
    #[serde(default)]
    pub auto_hedge: HedgeConfig,
    /// Per-market overrides keyed by market id (string-keyed for toml).
    #[serde(default)]
    pub assets: HashMap<String, AssetParams>,
    /// Bias applied to markets without an `assets` entry.
    #[serde(default)]
    pub default_bias: f64,
}

fn default_fixed_size() -> f64 {
    0.1
}

fn default_percent_per_level() -> f64 {
    0.01
}

fn default_max_levels() -> usize {
    3
}

fn default_requote_threshold() -> f64 {
    0.0002
}

fn default_requote_interval_ms() -> u64 {
    30_000
}

fn default_skew_factor() -> f64 {
    0.5
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            quantity_mode: QuantityMode::Fixed,
            fixed_size: default_fixed_size(),
            percent_per_level: default_percent_per_level(),
            tiered_multipliers: Vec::new(),
            spread: SpreadConfig::default(),
            max_levels: default_max_levels(),
            requote_threshold: default_requote_threshold(),
            requote_interval_ms: default_requote_interval_ms(),
            inventory_skew_enabled: false,
            inventory_skew_factor: default_skew_factor(),
            auto_hedge: HedgeConfig::default(),
            assets: HashMap::new(),
            default_bias: 0.0,
        }
    }
}

impl MakerConfig {
    /// Bias for a market, falling back to `default_bias`.
    pub fn bias_for(&self, market: u32) -> f64 {
        self.assets
            .get(market.to_string().as_str())
            .map(|a| a.bias)
            .unwrap_or(self.default_bias)
    }

    /// Validate field ranges; returns the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=10).contains(&self.max_levels) {
            return Err(format!("max_levels must be in [1, 10], got {}", self.max_levels));
        }
        if self.spread.min <= 0.0 || self.spread.max < self.spread.min {
            return Err(format!(
                "spread bounds must satisfy 0 < min <= max, got min={} max={}",
                self.spread.min, self.spread.max
            ));
        }
        if self.spread.depth_levels == 0 {
            return Err("spread.depth_levels must be positive".to_string());
        }
        if !(0.0..=0.01).contains(&self.requote_threshold) {
            return Err(format!(
                "requote_threshold must be in [0, 0.01], got {}",
                self.requote_threshold
            ));
        }
        match self.quantity_mode {
            QuantityMode::Fixed => {
                if self.fixed_size <= 0.0 {
                    return Err("fixed_size must be positive in fixed mode".to_string());
                }
            }
            QuantityMode::Percentage => {
                if self.percent_per_level <= 0.0 {
                    return Err(
                        "percent_per_level must be positive in percentage mode".to_string()
                    );
                }
            }
            QuantityMode::Tiered => {
                if self.tiered_multipliers.len() < self.max_levels {
                    return Err(format!(
                        "tiered_multipliers needs at least max_levels={} entries, got {}",
                        self.max_levels,
                        self.tiered_multipliers.len()
                    ));
                }
                let sum: f64 = self.tiered_multipliers.iter().sum();
                if (sum - 1.0).abs() > TIERED_SUM_TOLERANCE {
                    return Err(format!(
                        "tiered_multipliers must sum to 1.0 +/- {TIERED_SUM_TOLERANCE}, got {sum}"
                    ));
                }
            }
        }
        if self.auto_hedge.enabled
            && !(self.auto_hedge.imbalance_threshold > 0.0
                && self.auto_hedge.imbalance_threshold < 1.0)
        {
            return Err(format!(
                "auto_hedge.imbalance_threshold must be in (0, 1), got {}",
                self.auto_hedge.imbalance_threshold
            ));
        }
        for (market, params) in &self.assets {
            if !(-0.01..=0.01).contains(&params.bias) {
                return Err(format!(
                    "assets.{market}.bias must be in [-0.01, 0.01], got {}",
                    params.bias
                ));
            }
        }
        if !(-0.01..=0.01).contains(&self.default_bias) {
            return Err(format!(
                "default_bias must be in [-0.01, 0.01], got {}",
                self.default_bias
            ));
        }
        Ok(())
    }
}

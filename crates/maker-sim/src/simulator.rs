//! Bar generator.

use maker_core::{now_ms, HistoricalBar};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::str::FromStr;

/// Bar cadence: one minute.
const BAR_INTERVAL_MS: i64 = 60_000;

/// Generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub start_price: f64,
    /// Per-bar return scale of the random walk.
    pub volatility: f64,
    /// Scale of the uniform drift term.
    pub trend_strength: f64,
    /// Book depth range the per-bar depths are drawn from.
    pub depth_min: f64,
    pub depth_max: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            volatility: 0.002,
            trend_strength: 0.0005,
            depth_min: 20.0,
            depth_max: 200.0,
        }
    }
}

/// Market regime presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Thin books, doubled volatility.
    Illiquid,
    TrendingUp,
    TrendingDown,
    /// Tight drift, elevated chop.
    Ranging,
}

impl Scenario {
    /// Rewrite `config` with this scenario's overrides.
    pub fn apply(self, config: &mut SimConfig) {
        match self {
            Self::Illiquid => {
                config.depth_max = config.depth_min;
                config.depth_min *= 0.5;
                config.volatility *= 2.0;
            }
            Self::TrendingUp => config.trend_strength = 0.001,
            Self::TrendingDown => config.trend_strength = -0.001,
            Self::Ranging => {
                config.trend_strength = 0.0001;
                config.volatility = 0.01;
            }
        }
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "illiquid" => Ok(Self::Illiquid),
            "trending" | "trending-up" => Ok(Self::TrendingUp),
            "trending-down" => Ok(Self::TrendingDown),
            "ranging" => Ok(Self::Ranging),
            other => Err(format!(
                "unknown scenario {other:?} (expected illiquid, trending, trending-down, or ranging)"
            )),
        }
    }
}

/// Seeded bar stream generator.
pub struct Simulator {
    config: SimConfig,
    rng: StdRng,
}

impl Simulator {
    pub fn new(config: SimConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Apply a scenario preset before generating.
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        scenario.apply(&mut self.config);
        self
    }

    /// Generate `steps` one-minute bars ending now.
    pub fn generate(&mut self, steps: usize) -> Vec<HistoricalBar> {
        let start_ms = now_ms() - steps as i64 * BAR_INTERVAL_MS;
        let mut prev_close = self.config.start_price;
        let mut bars = Vec::with_capacity(steps);

        for i in 0..steps {
            let z = self.standard_normal();
            let drift = self.config.trend_strength * (self.rng.gen::<f64>() - 0.5);
            let walk = self.config.volatility * z;

            let open = prev_close;
            let close = prev_close * (1.0 + drift + walk);
            let high = close * (1.0 + walk.abs() * 0.5);
            let low = close * (1.0 - walk.abs() * 0.5);
            let volume = 1000.0 + 9000.0 * self.rng.gen::<f64>();

            let bid_depth = self.rng.gen_range(self.config.depth_min..=self.config.depth_max);
            let ask_depth = self.rng.gen_range(self.config.depth_min..=self.config.depth_max);

            bars.push(HistoricalBar {
                timestamp_ms: start_ms + i as i64 * BAR_INTERVAL_MS,
                open,
                high,
                low,
                close,
                volume,
                bid_depth,
                ask_depth,
            });
            prev_close = close;
        }

        bars
    }

    /// Standard normal via Box-Muller from two uniforms.
    fn standard_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(seed: u64, steps: usize) -> Vec<HistoricalBar> {
        Simulator::new(SimConfig::default(), Some(seed)).generate(steps)
    }

    #[test]
    fn test_bar_cadence_is_one_minute() {
        let bars = generate(7, 10);
        assert_eq!(bars.len(), 10);
        for pair in bars.windows(2) {
            assert_eq!(pair[1].timestamp_ms - pair[0].timestamp_ms, 60_000);
        }
    }

    #[test]
    fn test_same_seed_same_bars() {
        assert_eq!(generate(42, 50), generate(42, 50));
    }

    #[test]
    fn test_different_seed_different_bars() {
        assert_ne!(generate(1, 50), generate(2, 50));
    }

    #[test]
    fn test_bar_shape() {
        for bar in generate(3, 200) {
            // high and low bracket the close by construction.
            assert!(bar.high >= bar.close);
            assert!(bar.low <= bar.close);
            assert!(bar.low > 0.0);
            // volume ∈ [1000, 10000)
            assert!(bar.volume >= 1000.0 && bar.volume <= 10_000.0);
            assert!(bar.bid_depth >= 20.0 && bar.bid_depth <= 200.0);
        }
    }

    #[test]
    fn test_open_chains_to_previous_close() {
        let bars = generate(9, 20);
        for pair in bars.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[test]
    fn test_illiquid_scenario_thins_depth() {
        let bars = Simulator::new(SimConfig::default(), Some(5))
            .with_scenario(Scenario::Illiquid)
            .generate(100);
        // depth drawn from [10, 20] instead of [20, 200]
        for bar in bars {
            assert!(bar.bid_depth >= 10.0 && bar.bid_depth <= 20.0);
            assert!(bar.ask_depth >= 10.0 && bar.ask_depth <= 20.0);
        }
    }

    #[test]
    fn test_ranging_scenario_overrides() {
        let mut config = SimConfig::default();
        Scenario::Ranging.apply(&mut config);
        assert_eq!(config.trend_strength, 0.0001);
        assert_eq!(config.volatility, 0.01);
    }

    #[test]
    fn test_scenario_parsing() {
        assert_eq!("illiquid".parse::<Scenario>().unwrap(), Scenario::Illiquid);
        assert_eq!("trending".parse::<Scenario>().unwrap(), Scenario::TrendingUp);
        assert_eq!(
            "trending-down".parse::<Scenario>().unwrap(),
            Scenario::TrendingDown
        );
        assert_eq!("ranging".parse::<Scenario>().unwrap(), Scenario::Ranging);
        assert!("sideways".parse::<Scenario>().is_err());
    }
}

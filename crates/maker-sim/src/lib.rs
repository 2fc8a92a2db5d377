//! Synthetic bar streams for the backtest engine.
//!
//! A seeded random walk at 1-minute cadence, with scenario presets that
//! reshape volatility, trend, and depth to stress particular regimes.

pub mod simulator;

pub use simulator::{Scenario, SimConfig, Simulator};

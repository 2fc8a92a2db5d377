//! Backtest engine.
//!
//! Replays historical bars through the same decision modules the live
//! engine uses (spread, shaping, ladder spacing), with a probabilistic
//! fill model sweeping resting orders each bar and full PnL accounting.

pub mod data;
pub mod engine;
pub mod error;
pub mod metrics;

pub use data::{export_bars, export_csv, export_json, load_bars, EquityPoint};
pub use engine::{BacktestConfig, BacktestEngine, BacktestOutcome};
pub use error::BacktestError;
pub use metrics::BacktestResult;

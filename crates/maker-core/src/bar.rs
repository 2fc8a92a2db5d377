//! Historical bar data shared by the backtest engine and the simulator.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Depth assumed when a data file does not carry book depth columns.
pub const DEFAULT_BAR_DEPTH: f64 = 50.0;

/// One OHLCV bar plus the book depth observed over the bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default = "default_depth")]
    pub bid_depth: f64,
    #[serde(default = "default_depth")]
    pub ask_depth: f64,
}

fn default_depth() -> f64 {
    DEFAULT_BAR_DEPTH
}

impl HistoricalBar {
    /// Check the OHLC ordering invariant:
    /// `low <= min(open, close) <= max(open, close) <= high`.
    pub fn validate(&self) -> Result<()> {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low <= body_low && body_high <= self.high {
            Ok(())
        } else {
            Err(CoreError::InvalidBar {
                timestamp_ms: self.timestamp_ms,
                detail: format!(
                    "ohlc ordering violated: o={} h={} l={} c={}",
                    self.open, self.high, self.low, self.close
                ),
            })
        }
    }
}

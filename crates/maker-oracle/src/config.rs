//! Oracle configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported external ticker sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Binance,
    Bybit,
    Coinbase,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::Bybit => write!(f, "bybit"),
            Self::Coinbase => write!(f, "coinbase"),
        }
    }
}

/// Oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Sources queried on every refresh. Non-empty when enabled.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceKind>,
    /// Background refresh cadence.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Use the orderbook mid when the oracle has no fresh price.
    #[serde(default = "default_true")]
    pub fallback_to_orderbook: bool,
    /// Cache entry lifetime.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: i64,
}

fn default_sources() -> Vec<SourceKind> {
    vec![SourceKind::Binance, SourceKind::Bybit, SourceKind::Coinbase]
}

fn default_update_interval_ms() -> u64 {
    10_000
}

fn default_cache_timeout_ms() -> i64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sources: default_sources(),
            update_interval_ms: default_update_interval_ms(),
            fallback_to_orderbook: true,
            cache_timeout_ms: default_cache_timeout_ms(),
        }
    }
}

impl OracleConfig {
    /// Validate field ranges; returns the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.sources.is_empty() {
            return Err("oracle.sources must be non-empty when the oracle is enabled".to_string());
        }
        if self.update_interval_ms == 0 {
            return Err("oracle.update_interval_ms must be positive".to_string());
        }
        if self.cache_timeout_ms <= 0 {
            return Err("oracle.cache_timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}

//! Price cache, concurrent source fan-out, and median aggregation.

use crate::config::{OracleConfig, SourceKind};
use crate::error::{OracleError, OracleResult};
use crate::sources::{fetch_quote, SourceQuote};
use dashmap::DashMap;
use futures_util::future::join_all;
use maker_core::now_ms;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// An aggregated (or single-source) reference price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePrice {
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
    /// Fractional spread `(ask - bid) / mid`.
    pub spread: f64,
    pub volume_24h: f64,
    pub timestamp_ms: i64,
    /// Contributing source, e.g. `"aggregated(binance,bybit)"`.
    pub source: String,
}

/// Aggregates external reference prices with cache and freshness semantics.
pub struct PriceOracle {
    config: OracleConfig,
    client: Client,
    cache: DashMap<String, ExchangePrice>,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl PriceOracle {
    pub fn new(config: OracleConfig) -> OracleResult<Self> {
        let client = Client::builder()
            .timeout(crate::sources::REQUEST_TIMEOUT)
            .build()
            .map_err(OracleError::Http)?;
        Ok(Self {
            config,
            client,
            cache: DashMap::new(),
            refresher: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Resolve a reference price for `symbol`.
    ///
    /// Serves from cache while fresh; otherwise queries every configured
    /// source concurrently and aggregates the successes. On a full blackout
    /// the stale cache entry is returned when one exists.
    pub async fn get_price(&self, symbol: &str) -> Option<ExchangePrice> {
        if let Some(entry) = self.cache.get(symbol) {
            if now_ms() - entry.timestamp_ms < self.config.cache_timeout_ms {
                return Some(entry.clone());
            }
        }

        let fetches = self.config.sources.iter().map(|&kind| {
            let client = self.client.clone();
            let symbol = symbol.to_string();
            async move { (kind, fetch_quote(&client, kind, &symbol).await) }
        });

        let mut quotes: Vec<(SourceKind, SourceQuote)> = Vec::new();
        for (kind, result) in join_all(fetches).await {
            match result {
                Ok(quote) => quotes.push((kind, quote)),
                Err(e) => warn!(source = %kind, symbol, error = %e, "ticker fetch failed"),
            }
        }

        if quotes.is_empty() {
            // Blackout: a stale entry beats no entry.
            return self.cache.get(symbol).map(|e| e.clone());
        }

        let price = aggregate(&quotes, now_ms());
        debug!(
            symbol,
            mid = price.mid,
            source = %price.source,
            "reference price refreshed"
        );
        self.cache.insert(symbol.to_string(), price.clone());
        Some(price)
    }

    /// Latest cached price regardless of freshness.
    pub fn cached(&self, symbol: &str) -> Option<ExchangePrice> {
        self.cache.get(symbol).map(|e| e.clone())
    }

    /// Whether the cached entry for `symbol` is younger than the TTL.
    pub fn is_fresh(&self, symbol: &str) -> bool {
        self.cache
            .get(symbol)
            .map(|e| now_ms() - e.timestamp_ms < self.config.cache_timeout_ms)
            .unwrap_or(false)
    }

    /// Start the background refresher: one immediate fetch per symbol, then
    /// one sweep every `update_interval_ms`.
    pub fn start_updates(self: &Arc<Self>, symbols: Vec<String>) {
        let oracle = Arc::clone(self);
        let interval = Duration::from_millis(self.config.update_interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for symbol in &symbols {
                    if oracle.get_price(symbol).await.is_none() {
                        warn!(symbol, "no reference price from any source");
                    }
                }
            }
        });
        if let Some(old) = self.refresher.lock().replace(handle) {
            old.abort();
        }
    }

    /// Cancel the background refresher.
    pub fn stop(&self) {
        if let Some(handle) = self.refresher.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for PriceOracle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Aggregate per-field by the lower-median index `n / 2` of the sorted
/// values; volume is averaged. This is not a multivariate median: bid, ask,
/// and mid are each picked independently.
fn aggregate(quotes: &[(SourceKind, SourceQuote)], timestamp_ms: i64) -> ExchangePrice {
    let median = |mut values: Vec<f64>| {
        values.sort_by(f64::total_cmp);
        values[values.len() / 2]
    };

    let bid = median(quotes.iter().map(|(_, q)| q.bid).collect());
    let ask = median(quotes.iter().map(|(_, q)| q.ask).collect());
    let mid = median(quotes.iter().map(|(_, q)| q.mid()).collect());
    let spread = if mid == 0.0 { 0.0 } else { (ask - bid) / mid };
    let volume_24h =
        quotes.iter().map(|(_, q)| q.volume_24h).sum::<f64>() / quotes.len() as f64;

    let names: Vec<String> = quotes.iter().map(|(kind, _)| kind.to_string()).collect();
    ExchangePrice {
        bid,
        ask,
        mid,
        spread,
        volume_24h,
        timestamp_ms,
        source: format!("aggregated({})", names.join(",")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: f64, ask: f64, volume: f64) -> SourceQuote {
        SourceQuote {
            bid,
            ask,
            volume_24h: volume,
        }
    }

    #[test]
    fn test_aggregate_three_sources_takes_median() {
        let quotes = vec![
            (SourceKind::Binance, quote(99.0, 101.0, 100.0)),
            (SourceKind::Bybit, quote(100.0, 102.0, 200.0)),
            (SourceKind::Coinbase, quote(98.0, 103.0, 300.0)),
        ];
        let price = aggregate(&quotes, 1_000);
        // sorted bids [98, 99, 100] → index 1 = 99
        assert_eq!(price.bid, 99.0);
        // sorted asks [101, 102, 103] → index 1 = 102
        assert_eq!(price.ask, 102.0);
        // mids [100, 101, 100.5] sorted [100, 100.5, 101] → 100.5
        assert_eq!(price.mid, 100.5);
        assert!((price.spread - (102.0 - 99.0) / 100.5).abs() < 1e-12);
        assert_eq!(price.volume_24h, 200.0);
        assert_eq!(price.source, "aggregated(binance,bybit,coinbase)");
        assert_eq!(price.timestamp_ms, 1_000);
    }

    #[test]
    fn test_aggregate_two_sources_takes_upper_index() {
        let quotes = vec![
            (SourceKind::Binance, quote(99.0, 101.0, 0.0)),
            (SourceKind::Bybit, quote(100.0, 102.0, 50.0)),
        ];
        let price = aggregate(&quotes, 0);
        // n = 2 → index 1 of the sorted values
        assert_eq!(price.bid, 100.0);
        assert_eq!(price.ask, 102.0);
        assert_eq!(price.volume_24h, 25.0);
    }

    #[test]
    fn test_aggregate_single_source() {
        let quotes = vec![(SourceKind::Coinbase, quote(99.5, 100.5, 10.0))];
        let price = aggregate(&quotes, 0);
        assert_eq!(price.bid, 99.5);
        assert_eq!(price.ask, 100.5);
        assert_eq!(price.mid, 100.0);
        assert_eq!(price.source, "aggregated(coinbase)");
    }

    #[test]
    fn test_freshness_tracks_ttl() {
        let oracle = PriceOracle::new(OracleConfig {
            cache_timeout_ms: 30_000,
            ..Default::default()
        })
        .unwrap();

        assert!(!oracle.is_fresh("SOL"));

        let mut price = aggregate(&[(SourceKind::Binance, quote(99.0, 101.0, 0.0))], now_ms());
        oracle.cache.insert("SOL".to_string(), price.clone());
        assert!(oracle.is_fresh("SOL"));

        // Backdate past the TTL.
        price.timestamp_ms = now_ms() - 31_000;
        oracle.cache.insert("SOL".to_string(), price);
        assert!(!oracle.is_fresh("SOL"));
        // The stale entry is still readable.
        assert!(oracle.cached("SOL").is_some());
    }
}

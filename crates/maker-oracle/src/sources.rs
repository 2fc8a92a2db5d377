//! Ticker source adapters.
//!
//! Each adapter issues one GET with a hard 5 s timeout and maps the
//! venue-specific payload into a quote. Any failure (transport, timeout,
//! payload shape) is reported per source and swallowed upstream.

use crate::config::SourceKind;
use crate::error::{OracleError, OracleResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Hard per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One source's successfully fetched quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceQuote {
    pub bid: f64,
    pub ask: f64,
    pub volume_24h: f64,
}

impl SourceQuote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Fetch one symbol's quote from one source.
pub async fn fetch_quote(
    client: &Client,
    kind: SourceKind,
    symbol: &str,
) -> OracleResult<SourceQuote> {
    let request = match kind {
        SourceKind::Binance => client.get(format!(
            "https://api.binance.com/api/v3/ticker/bookTicker?symbol={symbol}USDT"
        )),
        SourceKind::Bybit => client.get(format!(
            "https://api.bybit.com/v5/market/tickers?category=linear&symbol={symbol}USDT"
        )),
        SourceKind::Coinbase => client.get(format!(
            "https://api.exchange.coinbase.com/products/{symbol}-USD/ticker"
        )),
    };

    let send = async {
        let response = request.timeout(REQUEST_TIMEOUT).send().await?;
        let body = response.error_for_status()?.text().await?;
        Ok::<String, OracleError>(body)
    };
    let body = tokio::time::timeout(REQUEST_TIMEOUT, send)
        .await
        .map_err(|_| OracleError::Timeout)??;

    parse_payload(kind, &body)
}

/// Parse a source payload into a quote. Split out for tests.
pub fn parse_payload(kind: SourceKind, body: &str) -> OracleResult<SourceQuote> {
    match kind {
        SourceKind::Binance => {
            let ticker: BinanceBookTicker = decode(kind, body)?;
            Ok(SourceQuote {
                bid: parse_field(kind, "bidPrice", &ticker.bid_price)?,
                ask: parse_field(kind, "askPrice", &ticker.ask_price)?,
                // The bookTicker endpoint carries no volume.
                volume_24h: 0.0,
            })
        }
        SourceKind::Bybit => {
            let response: BybitTickers = decode(kind, body)?;
            let ticker = response.result.list.into_iter().next().ok_or_else(|| {
                OracleError::BadPayload {
                    exchange: "bybit",
                    detail: "empty result list".to_string(),
                }
            })?;
            Ok(SourceQuote {
                bid: parse_field(kind, "bid1Price", &ticker.bid1_price)?,
                ask: parse_field(kind, "ask1Price", &ticker.ask1_price)?,
                volume_24h: parse_field(kind, "volume24h", &ticker.volume_24h)?,
            })
        }
        SourceKind::Coinbase => {
            let ticker: CoinbaseTicker = decode(kind, body)?;
            Ok(SourceQuote {
                bid: parse_field(kind, "bid", &ticker.bid)?,
                ask: parse_field(kind, "ask", &ticker.ask)?,
                volume_24h: parse_field(kind, "volume", &ticker.volume)?,
            })
        }
    }
}

fn decode<'a, T: Deserialize<'a>>(kind: SourceKind, body: &'a str) -> OracleResult<T> {
    serde_json::from_str(body).map_err(|e| OracleError::BadPayload {
        exchange: source_name(kind),
        detail: e.to_string(),
    })
}

fn parse_field(kind: SourceKind, field: &str, value: &str) -> OracleResult<f64> {
    value.parse().map_err(|_| OracleError::BadPayload {
        exchange: source_name(kind),
        detail: format!("non-numeric {field}: {value:?}"),
    })
}

fn source_name(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Binance => "binance",
        SourceKind::Bybit => "bybit",
        SourceKind::Coinbase => "coinbase",
    }
}

#[derive(Debug, Deserialize)]
struct BinanceBookTicker {
    #[serde(rename = "bidPrice")]
    bid_price: String,
    #[serde(rename = "askPrice")]
    ask_price: String,
}

#[derive(Debug, Deserialize)]
struct BybitTickers {
    result: BybitResult,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
struct BybitTicker {
    #[serde(rename = "bid1Price")]
    bid1_price: String,
    #[serde(rename = "ask1Price")]
    ask1_price: String,
    #[serde(rename = "volume24h")]
    volume_24h: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    bid: String,
    ask: String,
    volume: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binance_book_ticker() {
        let body = r#"{"symbol":"SOLUSDT","bidPrice":"142.50","askPrice":"142.52"}"#;
        let quote = parse_payload(SourceKind::Binance, body).unwrap();
        assert_eq!(quote.bid, 142.50);
        assert_eq!(quote.ask, 142.52);
        assert_eq!(quote.volume_24h, 0.0);
        assert!((quote.mid() - 142.51).abs() < 1e-9);
    }

    #[test]
    fn test_parse_bybit_tickers() {
        let body = r#"{"retCode":0,"result":{"category":"linear","list":[
            {"symbol":"SOLUSDT","bid1Price":"142.48","ask1Price":"142.53","volume24h":"123456.7"}
        ]}}"#;
        let quote = parse_payload(SourceKind::Bybit, body).unwrap();
        assert_eq!(quote.bid, 142.48);
        assert_eq!(quote.ask, 142.53);
        assert_eq!(quote.volume_24h, 123456.7);
    }

    #[test]
    fn test_parse_bybit_empty_list_fails() {
        let body = r#"{"result":{"list":[]}}"#;
        assert!(matches!(
            parse_payload(SourceKind::Bybit, body),
            Err(OracleError::BadPayload { exchange: "bybit", .. })
        ));
    }

    #[test]
    fn test_parse_coinbase_ticker() {
        let body = r#"{"trade_id":1,"price":"142.51","bid":"142.49","ask":"142.54","volume":"98765.4"}"#;
        let quote = parse_payload(SourceKind::Coinbase, body).unwrap();
        assert_eq!(quote.bid, 142.49);
        assert_eq!(quote.ask, 142.54);
        assert_eq!(quote.volume_24h, 98765.4);
    }

    #[test]
    fn test_non_numeric_field_is_bad_payload() {
        let body = r#"{"symbol":"SOLUSDT","bidPrice":"n/a","askPrice":"142.52"}"#;
        assert!(matches!(
            parse_payload(SourceKind::Binance, body),
            Err(OracleError::BadPayload { .. })
        ));
    }
}

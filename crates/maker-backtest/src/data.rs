//! Bar file loading and result export.
//!
//! JSON files carry an array of bar objects with optional `timestamp`,
//! `bidDepth`, and `askDepth`; CSV files carry a header line naming the
//! columns. Bars violating the OHLC ordering are kept but logged.

use crate::engine::BacktestOutcome;
use crate::error::BacktestError;
use crate::metrics::BacktestResult;
use maker_core::{now_ms, HistoricalBar, DEFAULT_BAR_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

type Result<T> = std::result::Result<T, BacktestError>;

const BAR_INTERVAL_MS: i64 = 60_000;

/// One point of the exported equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}

/// Load bars from a `.json` or `.csv` file, decided by extension.
pub fn load_bars(path: &Path) -> Result<Vec<HistoricalBar>> {
    let content = std::fs::read_to_string(path).map_err(|source| BacktestError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let bars = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content, path)?,
        Some("csv") => parse_csv(&content, path)?,
        other => {
            return Err(BacktestError::BadData {
                path: path.display().to_string(),
                detail: format!("unsupported extension {other:?} (expected json or csv)"),
            })
        }
    };

    for bar in &bars {
        if let Err(e) = bar.validate() {
            warn!(error = %e, "bar fails ohlc ordering; keeping it");
        }
    }
    Ok(bars)
}

/// JSON wire shape: camelCase keys, optional timestamp and depths.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBar {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bid_depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ask_depth: Option<f64>,
}

fn parse_json(content: &str, path: &Path) -> Result<Vec<HistoricalBar>> {
    let wires: Vec<WireBar> =
        serde_json::from_str(content).map_err(|e| BacktestError::BadData {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
    let fallback_start = now_ms() - wires.len() as i64 * BAR_INTERVAL_MS;
    Ok(wires
        .into_iter()
        .enumerate()
        .map(|(i, w)| HistoricalBar {
            timestamp_ms: w
                .timestamp
                .unwrap_or(fallback_start + i as i64 * BAR_INTERVAL_MS),
            open: w.open,
            high: w.high,
            low: w.low,
            close: w.close,
            volume: w.volume,
            bid_depth: w.bid_depth.unwrap_or(DEFAULT_BAR_DEPTH),
            ask_depth: w.ask_depth.unwrap_or(DEFAULT_BAR_DEPTH),
        })
        .collect())
}

fn parse_csv(content: &str, path: &Path) -> Result<Vec<HistoricalBar>> {
    let bad = |detail: String| BacktestError::BadData {
        path: path.display().to_string(),
        detail,
    };

    let mut lines = content.lines().enumerate();
    let (_, header) = lines.next().ok_or_else(|| bad("empty file".to_string()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let index_of = |name: &str| columns.iter().position(|c| *c == name);

    let open_idx = index_of("open").ok_or_else(|| bad("missing open column".to_string()))?;
    let high_idx = index_of("high").ok_or_else(|| bad("missing high column".to_string()))?;
    let low_idx = index_of("low").ok_or_else(|| bad("missing low column".to_string()))?;
    let close_idx = index_of("close").ok_or_else(|| bad("missing close column".to_string()))?;
    let volume_idx = index_of("volume").ok_or_else(|| bad("missing volume column".to_string()))?;
    let ts_idx = index_of("timestamp");
    let bid_depth_idx = index_of("bidDepth").or_else(|| index_of("bid_depth"));
    let ask_depth_idx = index_of("askDepth").or_else(|| index_of("ask_depth"));

    let rows: Vec<(usize, &str)> = lines.filter(|(_, l)| !l.trim().is_empty()).collect();
    let fallback_start = now_ms() - rows.len() as i64 * BAR_INTERVAL_MS;

    let mut bars = Vec::with_capacity(rows.len());
    for (bar_index, (line_number, line)) in rows.into_iter().enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let number = |idx: usize, name: &str| -> Result<f64> {
            let raw = fields
                .get(idx)
                .ok_or_else(|| bad(format!("line {}: missing {name}", line_number + 1)))?;
            raw.parse().map_err(|_| {
                bad(format!(
                    "line {}: non-numeric {name}: {raw:?}",
                    line_number + 1
                ))
            })
        };

        let timestamp_ms = match ts_idx {
            Some(idx) => number(idx, "timestamp")? as i64,
            None => fallback_start + bar_index as i64 * BAR_INTERVAL_MS,
        };
        bars.push(HistoricalBar {
            timestamp_ms,
            open: number(open_idx, "open")?,
            high: number(high_idx, "high")?,
            low: number(low_idx, "low")?,
            close: number(close_idx, "close")?,
            volume: number(volume_idx, "volume")?,
            bid_depth: match bid_depth_idx {
                Some(idx) => number(idx, "bidDepth")?,
                None => DEFAULT_BAR_DEPTH,
            },
            ask_depth: match ask_depth_idx {
                Some(idx) => number(idx, "askDepth")?,
                None => DEFAULT_BAR_DEPTH,
            },
        });
    }
    Ok(bars)
}

/// Write bars in the JSON wire format `load_bars` reads, so an exported
/// file loads back to an identical sequence.
pub fn export_bars(bars: &[HistoricalBar], path: &Path) -> Result<()> {
    let wires: Vec<WireBar> = bars
        .iter()
        .map(|b| WireBar {
            timestamp: Some(b.timestamp_ms),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
            bid_depth: Some(b.bid_depth),
            ask_depth: Some(b.ask_depth),
        })
        .collect();
    let json = serde_json::to_string_pretty(&wires).map_err(|e| BacktestError::BadData {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|source| BacktestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Exported JSON document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    summary: &'a BacktestResult,
    equity: Vec<EquityPoint>,
    generated_at: String,
}

fn equity_points(outcome: &BacktestOutcome) -> Vec<EquityPoint> {
    outcome
        .timestamps
        .iter()
        .zip(&outcome.equity)
        .map(|(&timestamp, &equity)| EquityPoint { timestamp, equity })
        .collect()
}

/// Write `{summary, equity, generatedAt}` JSON.
pub fn export_json(outcome: &BacktestOutcome, path: &Path) -> Result<()> {
    let document = ExportDocument {
        summary: &outcome.result,
        equity: equity_points(outcome),
        generated_at: chrono::Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&document).map_err(|e| BacktestError::BadData {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|source| BacktestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Write the equity curve as `timestamp,equity` CSV.
pub fn export_csv(outcome: &BacktestOutcome, path: &Path) -> Result<()> {
    let mut out = String::from("timestamp,equity\n");
    for point in equity_points(outcome) {
        out.push_str(&format!("{},{}\n", point.timestamp, point.equity));
    }
    std::fs::write(path, out).map_err(|source| BacktestError::Io {
        path: path.display().to_string(),
        source,
    })
}

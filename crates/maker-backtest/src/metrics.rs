//! Performance metrics over a finished replay.

use maker_core::{RestingOrder, Side};
use serde::{Deserialize, Serialize};

/// Annualization factor for the per-bar Sharpe ratio.
const SHARPE_ANNUALIZATION: f64 = 252.0;

/// Summary statistics for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub total_pnl: f64,
    pub total_volume: f64,
    pub num_trades: u32,
    pub num_wins: u32,
    pub num_losses: u32,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    /// Max peak-to-trough drawdown as a fraction of the peak.
    pub max_drawdown: f64,
    /// Mean realized spread over round trips.
    pub avg_spread: f64,
    pub fill_rate: f64,
    pub start_balance: f64,
    pub end_balance: f64,
    /// Mean depth of completed drawdown intervals.
    pub avg_drawdown: f64,
    /// Longest drawdown interval, in bars.
    pub longest_drawdown_bars: u32,
    /// Total return over max drawdown; zero when there was no drawdown.
    pub calmar_ratio: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Gross wins over gross losses; zero when there were no losses.
    pub profit_factor: f64,
}

/// Compute the full metric set.
pub fn compute(
    start_balance: f64,
    end_equity: f64,
    fills: &[RestingOrder],
    placed: u64,
    equity: &[f64],
) -> BacktestResult {
    let trades = pair_round_trips(fills);
    let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
    let num_trades = trades.len() as u32;

    let total_volume = fills
        .iter()
        .map(|f| f.size.inner() * f.price.inner())
        .sum();

    let avg_spread = if trades.is_empty() {
        0.0
    } else {
        trades.iter().map(|t| t.spread).sum::<f64>() / trades.len() as f64
    };

    let drawdown = drawdown_stats(equity);
    let total_return = if start_balance == 0.0 {
        0.0
    } else {
        (end_equity - start_balance) / start_balance
    };

    let gross_win: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();

    BacktestResult {
        total_pnl: end_equity - start_balance,
        total_volume,
        num_trades,
        num_wins: wins.len() as u32,
        num_losses: losses.len() as u32,
        win_rate: if num_trades == 0 {
            0.0
        } else {
            wins.len() as f64 / num_trades as f64
        },
        sharpe_ratio: sharpe(equity),
        max_drawdown: drawdown.max_depth,
        avg_spread,
        fill_rate: if placed == 0 {
            0.0
        } else {
            fills.len() as f64 / placed as f64
        },
        start_balance,
        end_balance: end_equity,
        avg_drawdown: drawdown.avg_depth,
        longest_drawdown_bars: drawdown.longest_bars,
        calmar_ratio: if drawdown.max_depth > 0.0 {
            total_return / drawdown.max_depth
        } else {
            0.0
        },
        avg_win: mean(&wins),
        avg_loss: mean(&losses).abs(),
        largest_win: wins.iter().copied().fold(0.0, f64::max),
        largest_loss: losses.iter().map(|l| l.abs()).fold(0.0, f64::max),
        profit_factor: if gross_loss > 0.0 {
            gross_win / gross_loss
        } else {
            0.0
        },
    }
}

struct RoundTrip {
    pnl: f64,
    /// `|price change| / opening fill price`.
    spread: f64,
}

/// Pair consecutive opposite-side fills into round trips, closing with the
/// earlier fill's size.
fn pair_round_trips(fills: &[RestingOrder]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    for pair in fills.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.side == next.side {
            continue;
        }
        let closed = prev.size.inner();
        let pnl = match prev.side {
            Side::Bid => closed * (next.price.inner() - prev.price.inner()),
            Side::Ask => closed * (prev.price.inner() - next.price.inner()),
        };
        let spread = if prev.price.is_zero() {
            0.0
        } else {
            (next.price.inner() - prev.price.inner()).abs() / prev.price.inner()
        };
        trips.push(RoundTrip { pnl, spread });
    }
    trips
}

/// Per-bar returns annualized with the √252 convention.
fn sharpe(equity: &[f64]) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        mean / stddev * SHARPE_ANNUALIZATION.sqrt()
    } else {
        0.0
    }
}

struct DrawdownStats {
    max_depth: f64,
    avg_depth: f64,
    longest_bars: u32,
}

/// Running-peak drawdown statistics.
///
/// An interval starts when equity drops below the running peak and
/// completes when it recovers to the peak; the average depth is taken over
/// completed intervals only, while the longest duration also counts an
/// interval still open at the end of the series.
fn drawdown_stats(equity: &[f64]) -> DrawdownStats {
    let mut peak = f64::MIN;
    let mut max_depth = 0.0f64;
    let mut completed_depths: Vec<f64> = Vec::new();
    let mut current_depth = 0.0f64;
    let mut current_len = 0u32;
    let mut longest_bars = 0u32;

    for &value in equity {
        if value >= peak {
            if current_len > 0 {
                completed_depths.push(current_depth);
                longest_bars = longest_bars.max(current_len);
                current_depth = 0.0;
                current_len = 0;
            }
            peak = value;
            continue;
        }
        let depth = if peak != 0.0 { (peak - value) / peak } else { 0.0 };
        max_depth = max_depth.max(depth);
        current_depth = current_depth.max(depth);
        current_len += 1;
    }
    longest_bars = longest_bars.max(current_len);

    DrawdownStats {
        max_depth,
        avg_depth: mean(&completed_depths),
        longest_bars,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

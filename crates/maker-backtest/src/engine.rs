//! Bar replay loop: fill sweep, position accounting, quote placement.

use crate::error::BacktestError;
use crate::metrics::{self, BacktestResult};
use maker_core::{
    AccountView, Balance, BookLevel, HistoricalBar, MarketId, OrderId, OrderbookSnapshot, Price,
    RestingOrder, Side, Size,
};
use maker_mm::{InventoryShaper, MakerConfig, SpreadEngine};
use maker_risk::{RiskConfig, RiskGate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Resting orders older than this are dropped unfilled.
const ORDER_MAX_AGE_MS: i64 = 60_000;

/// Offsets applied to the bar close when synthesizing the one-level book.
const SYNTH_BID_OFFSET: f64 = 0.999;
const SYNTH_ASK_OFFSET: f64 = 1.001;

/// Fill probabilities by bar geometry.
const FILL_P_TOUCHED: f64 = 0.8;
const FILL_P_NEAR: f64 = 0.3;
const FILL_P_FAR: f64 = 0.05;

/// Backtest run parameters.
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// RNG seed for the fill draws; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            seed: None,
        }
    }
}

/// A finished run: summary metrics plus the equity series.
#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub result: BacktestResult,
    pub equity: Vec<f64>,
    pub timestamps: Vec<i64>,
}

/// Tracked position, single market.
#[derive(Debug, Clone, Copy, Default)]
struct BookPosition {
    size: f64,
    entry: f64,
    unrealized: f64,
}

/// Replays bars through the quoting pipeline with simulated fills.
pub struct BacktestEngine {
    maker: MakerConfig,
    spread: SpreadEngine,
    shaper: InventoryShaper,
    gate: RiskGate,
    config: BacktestConfig,
    rng: StdRng,

    balance: f64,
    position: BookPosition,
    open_orders: Vec<RestingOrder>,
    fills: Vec<RestingOrder>,
    placed_count: u64,
    next_order_id: u64,
    equity: Vec<f64>,
    timestamps: Vec<i64>,
}

impl BacktestEngine {
    pub fn new(maker: MakerConfig, risk: RiskConfig, config: BacktestConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            spread: SpreadEngine::new(maker.spread.clone()),
            shaper: InventoryShaper::new(maker.clone()),
            gate: RiskGate::new(risk),
            maker,
            config,
            rng,
            balance: 0.0,
            position: BookPosition::default(),
            open_orders: Vec::new(),
            fills: Vec::new(),
            placed_count: 0,
            next_order_id: 1,
            equity: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// Run the full replay and compute metrics.
    pub fn run(mut self, bars: &[HistoricalBar]) -> Result<BacktestOutcome, BacktestError> {
        if bars.is_empty() {
            return Err(BacktestError::NoBars);
        }
        self.balance = self.config.initial_balance;

        for bar in bars {
            self.step(bar);
        }

        let result = metrics::compute(
            self.config.initial_balance,
            self.balance + self.position.unrealized,
            &self.fills,
            self.placed_count,
            &self.equity,
        );
        Ok(BacktestOutcome {
            result,
            equity: self.equity,
            timestamps: self.timestamps,
        })
    }

    /// One bar: sweep fills, cancel stale orders, mark to market, requote.
    fn step(&mut self, bar: &HistoricalBar) {
        self.sweep_fills(bar);
        self.cancel_aged(bar.timestamp_ms);
        self.mark_to_market(bar.close);
        self.place_quotes(bar);
        self.equity.push(self.balance + self.position.unrealized);
        self.timestamps.push(bar.timestamp_ms);
    }

    /// Draw a fill for every resting order against the bar's range.
    ///
    /// Orders are visited in placement order, so a bid and an ask can both
    /// fill inside one bar and the realized PnL follows that sequence.
    fn sweep_fills(&mut self, bar: &HistoricalBar) {
        let mut still_open = Vec::with_capacity(self.open_orders.len());
        for mut order in std::mem::take(&mut self.open_orders) {
            let p = fill_probability(&order, bar);
            if self.rng.gen::<f64>() < p {
                order.filled = true;
                order.filled_at_ms = Some(bar.timestamp_ms);
                self.apply_fill(&order);
                self.fills.push(order);
            } else {
                still_open.push(order);
            }
        }
        self.open_orders = still_open;
    }

    /// Position update on a fill, realizing PnL when the fill reduces.
    fn apply_fill(&mut self, order: &RestingOrder) {
        let price = order.price.inner();
        let delta = order.side.sign() * order.size.inner();
        let old = self.position.size;
        let new = old + delta;

        if old * delta < 0.0 {
            // Reducing or crossing through flat: realize on the closed part.
            let closed = old.abs().min(delta.abs());
            let pnl = if old > 0.0 {
                closed * (price - self.position.entry)
            } else {
                closed * (self.position.entry - price)
            };
            self.balance += pnl;
            debug!(closed, pnl, "realized on reducing fill");
        }

        if new == 0.0 {
            self.position.entry = 0.0;
        } else if old != 0.0 && new.signum() != old.signum() {
            // Flipped through zero: the remainder opens at the fill price.
            self.position.entry = price;
        } else if old == 0.0 || delta.signum() == old.signum() {
            // Opening or adding: weighted-average entry.
            self.position.entry = (old * self.position.entry + delta * price) / new;
        }
        // Same-sign decrease keeps the entry.

        self.position.size = new;
    }

    /// Drop unfilled orders older than 60 s.
    fn cancel_aged(&mut self, now_ms: i64) {
        self.open_orders
            .retain(|o| o.age_ms(now_ms) < ORDER_MAX_AGE_MS);
    }

    fn mark_to_market(&mut self, close: f64) {
        self.position.unrealized = if self.position.size > 0.0 {
            self.position.size * (close - self.position.entry)
        } else if self.position.size < 0.0 {
            self.position.size.abs() * (self.position.entry - close)
        } else {
            0.0
        };
    }

    /// Quote both sides off a book synthesized from the bar.
    fn place_quotes(&mut self, bar: &HistoricalBar) {
        let market = MarketId::new(0);
        let mut book = OrderbookSnapshot::new(market, bar.timestamp_ms);
        book.bids = vec![BookLevel::new(bar.close * SYNTH_BID_OFFSET, bar.bid_depth)];
        book.asks = vec![BookLevel::new(bar.close * SYNTH_ASK_OFFSET, bar.ask_depth)];

        let depth = self.spread.dynamic_spread(&book);
        let account = self.account_view(market);
        let shaped = self.shaper.shape(
            &self.gate,
            &account,
            market,
            Price::new(bar.close),
            depth.spread,
        );

        for level in 0..self.maker.max_levels {
            let spacing = depth.spread * (level + 1) as f64 * 0.5;
            let size = Size::new(self.maker.fixed_size);
            self.place(
                market,
                Side::Bid,
                shaped.bid_price * (1.0 - spacing),
                size,
                bar.timestamp_ms,
            );
            self.place(
                market,
                Side::Ask,
                shaped.ask_price * (1.0 + spacing),
                size,
                bar.timestamp_ms,
            );
        }
    }

    fn place(&mut self, market: MarketId, side: Side, price: Price, size: Size, now_ms: i64) {
        let order = RestingOrder {
            id: OrderId(self.next_order_id),
            market,
            side,
            price,
            size,
            reduce_only: false,
            placed_at_ms: now_ms,
            filled: false,
            filled_at_ms: None,
        };
        self.next_order_id += 1;
        self.placed_count += 1;
        self.open_orders.push(order);
    }

    /// Account view the shaper reads: the backtest's own balance/position.
    fn account_view(&self, market: MarketId) -> AccountView {
        let mut view = AccountView {
            balance: Balance::new(self.balance, self.balance),
            positions: Default::default(),
            margin_fraction: 1.0,
        };
        if self.position.size != 0.0 {
            view.positions.insert(
                market,
                maker_core::Position {
                    market,
                    size: self.position.size,
                    entry_price: Price::new(self.position.entry),
                    unrealized_pnl: self.position.unrealized,
                },
            );
        }
        view
    }
}

/// Probability that an order fills against a bar.
///
/// Bids: the bar trading through the price (`low <= price`) fills at 0.8,
/// closing below at 0.3, otherwise 0.05. Asks are symmetric.
fn fill_probability(order: &RestingOrder, bar: &HistoricalBar) -> f64 {
    let price = order.price.inner();
    match order.side {
        Side::Bid => {
            if bar.low <= price {
                FILL_P_TOUCHED
            } else if bar.close < price {
                FILL_P_NEAR
            } else {
                FILL_P_FAR
            }
        }
        Side::Ask => {
            if bar.high >= price {
                FILL_P_TOUCHED
            } else if bar.close > price {
                FILL_P_NEAR
            } else {
                FILL_P_FAR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, open: f64, high: f64, low: f64, close: f64) -> HistoricalBar {
        HistoricalBar {
            timestamp_ms: ts,
            open,
            high,
            low,
            close,
            volume: 1000.0,
            bid_depth: 50.0,
            ask_depth: 50.0,
        }
    }

    fn order(side: Side, price: f64) -> RestingOrder {
        RestingOrder {
            id: OrderId(1),
            market: MarketId::new(0),
            side,
            price: Price::new(price),
            size: Size::new(0.1),
            reduce_only: false,
            placed_at_ms: 0,
            filled: false,
            filled_at_ms: None,
        }
    }

    fn engine(seed: u64) -> BacktestEngine {
        BacktestEngine::new(
            MakerConfig {
                max_levels: 1,
                fixed_size: 0.1,
                ..Default::default()
            },
            RiskConfig::default(),
            BacktestConfig {
                initial_balance: 10_000.0,
                seed: Some(seed),
            },
        )
    }

    #[test]
    fn test_fill_probability_bid_tiers() {
        // Bar low touches the bid price → 0.8
        assert_eq!(
            fill_probability(&order(Side::Bid, 99.9), &bar(0, 100.0, 100.5, 99.5, 100.0)),
            0.8
        );
        // Close below price but low above → 0.3
        assert_eq!(
            fill_probability(&order(Side::Bid, 99.9), &bar(0, 100.0, 100.5, 99.95, 99.92)),
            0.3
        );
        // Price far below the range → 0.05
        assert_eq!(
            fill_probability(&order(Side::Bid, 99.0), &bar(0, 100.0, 100.5, 99.5, 100.0)),
            0.05
        );
    }

    #[test]
    fn test_fill_probability_ask_tiers() {
        assert_eq!(
            fill_probability(&order(Side::Ask, 100.1), &bar(0, 100.0, 100.5, 99.5, 100.0)),
            0.8
        );
        assert_eq!(
            fill_probability(&order(Side::Ask, 100.1), &bar(0, 100.0, 100.05, 99.5, 100.02)),
            0.3
        );
        assert_eq!(
            fill_probability(&order(Side::Ask, 101.0), &bar(0, 100.0, 100.5, 99.5, 100.0)),
            0.05
        );
    }

    #[test]
    fn test_apply_fill_weighted_average_entry() {
        let mut e = engine(1);
        e.balance = 10_000.0;
        e.apply_fill(&RestingOrder {
            size: Size::new(1.0),
            ..order(Side::Bid, 100.0)
        });
        e.apply_fill(&RestingOrder {
            size: Size::new(1.0),
            ..order(Side::Bid, 102.0)
        });
        // (1*100 + 1*102) / 2 = 101
        assert_eq!(e.position.size, 2.0);
        assert_eq!(e.position.entry, 101.0);
    }

    #[test]
    fn test_apply_fill_reduce_realizes_pnl() {
        let mut e = engine(1);
        e.balance = 10_000.0;
        e.apply_fill(&RestingOrder {
            size: Size::new(1.0),
            ..order(Side::Bid, 100.0)
        });
        e.apply_fill(&RestingOrder {
            size: Size::new(0.4),
            ..order(Side::Ask, 105.0)
        });
        // Realized 0.4 * (105 - 100) = 2; entry unchanged on same-sign decrease.
        assert!((e.balance - 10_002.0).abs() < 1e-9);
        assert!((e.position.size - 0.6).abs() < 1e-12);
        assert_eq!(e.position.entry, 100.0);
    }

    #[test]
    fn test_apply_fill_flip_resets_entry() {
        let mut e = engine(1);
        e.balance = 10_000.0;
        e.apply_fill(&RestingOrder {
            size: Size::new(1.0),
            ..order(Side::Bid, 100.0)
        });
        e.apply_fill(&RestingOrder {
            size: Size::new(3.0),
            ..order(Side::Ask, 110.0)
        });
        // Closed 1 @ +10, flipped short 2 with entry at the fill price.
        assert!((e.balance - 10_010.0).abs() < 1e-9);
        assert_eq!(e.position.size, -2.0);
        assert_eq!(e.position.entry, 110.0);
    }

    #[test]
    fn test_apply_fill_close_to_flat_clears_entry() {
        let mut e = engine(1);
        e.balance = 10_000.0;
        e.apply_fill(&RestingOrder {
            size: Size::new(1.0),
            ..order(Side::Bid, 100.0)
        });
        e.apply_fill(&RestingOrder {
            size: Size::new(1.0),
            ..order(Side::Ask, 99.0)
        });
        // Realized 1 * (99 - 100) = -1.
        assert!((e.balance - 9_999.0).abs() < 1e-9);
        assert_eq!(e.position.size, 0.0);
        assert_eq!(e.position.entry, 0.0);
    }

    #[test]
    fn test_mark_to_market_short() {
        let mut e = engine(1);
        e.position.size = -2.0;
        e.position.entry = 100.0;
        e.mark_to_market(90.0);
        // Short 2 from 100 marked at 90 → +20.
        assert_eq!(e.position.unrealized, 20.0);
    }

    #[test]
    fn test_age_cancel_drops_stale_orders() {
        let mut e = engine(1);
        e.open_orders.push(order(Side::Bid, 99.0));
        e.open_orders.push(RestingOrder {
            placed_at_ms: 50_000,
            ..order(Side::Bid, 99.0)
        });
        e.cancel_aged(60_000);
        // The order placed at t=0 is 60 s old and dropped.
        assert_eq!(e.open_orders.len(), 1);
        assert_eq!(e.open_orders[0].placed_at_ms, 50_000);
    }

    #[test]
    fn test_each_bar_places_two_orders_per_level() {
        let e = engine(1);
        let outcome = e.run(&[bar(0, 100.0, 100.5, 99.5, 100.0)]).unwrap();
        assert_eq!(outcome.result.fill_rate, 0.0);
        assert_eq!(outcome.equity.len(), 1);
    }

    #[test]
    fn test_run_rejects_empty_input() {
        assert!(matches!(
            engine(1).run(&[]),
            Err(BacktestError::NoBars)
        ));
    }

    #[test]
    fn test_round_trip_realizes_exact_pnl() {
        // Drive the engine manually: a filled bid then a filled ask of the
        // same size yields exactly size * (ask - bid).
        let mut e = engine(1);
        e.balance = 10_000.0;
        e.apply_fill(&RestingOrder {
            size: Size::new(0.1),
            ..order(Side::Bid, 99.9)
        });
        e.apply_fill(&RestingOrder {
            size: Size::new(0.1),
            ..order(Side::Ask, 100.1)
        });
        let expected = 0.1 * (100.1 - 99.9);
        assert!((e.balance - (10_000.0 + expected)).abs() < 1e-9);
    }

    #[test]
    fn test_replay_over_simulated_bars() {
        let bars = maker_sim::Simulator::new(maker_sim::SimConfig::default(), Some(11))
            .generate(500);
        let outcome = engine(7).run(&bars).unwrap();
        assert_eq!(outcome.equity.len(), 500);
        assert!(outcome.result.fill_rate > 0.0 && outcome.result.fill_rate <= 1.0);
        assert!(outcome.result.end_balance.is_finite());
    }

    #[test]
    fn test_seeded_run_is_deterministic() {
        let bars: Vec<HistoricalBar> = (0..200)
            .map(|i| {
                let drift = (i as f64 * 0.7).sin();
                bar(
                    i * 60_000,
                    100.0 + drift,
                    100.6 + drift,
                    99.4 + drift,
                    100.0 + drift,
                )
            })
            .collect();
        let a = engine(99).run(&bars).unwrap();
        let b = engine(99).run(&bars).unwrap();
        assert_eq!(a.result.num_trades, b.result.num_trades);
        assert_eq!(a.equity, b.equity);
        // With lows sweeping through the bids, fills must happen.
        assert!(a.result.fill_rate > 0.0);
    }
}

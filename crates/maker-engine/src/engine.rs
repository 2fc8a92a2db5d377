//! The quote engine: per-market pipeline orchestration.

use crate::error::{EngineError, EngineResult};
use crate::hedge::HedgeExecutor;
use maker_core::{
    now_ms, AccountView, Market, MarketId, OrderIntent, OrderbookSnapshot, Price, QuoteLadder,
    QuoteLevel, Size,
};
use maker_mm::{InventoryShaper, MakerConfig, Sizer, SpreadEngine};
use maker_oracle::PriceOracle;
use maker_risk::{RiskConfig, RiskGate};
use maker_venue::VenueClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Half-spread multiplier per ladder level: level i sits
/// `spread * (i + 1) * 0.5` beyond the shaped bid/ask.
const LEVEL_SPACING_FACTOR: f64 = 0.5;

/// Size step used when rounding emitted order sizes.
const SIZE_STEP: f64 = 0.01;

/// Per-market quoting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotePhase {
    /// Subscribed, no successful quote cycle yet.
    NoQuote,
    /// Ladder believed resting at the venue.
    Quoting,
    /// Last cycle was suppressed (health, risk, or sizing).
    Suppressed,
}

/// Best bid/ask prices of the last placed ladder.
///
/// Created on the first successful quote, updated whenever the requote gate
/// passes, preserved across suppressed cycles while the market stays
/// subscribed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastQuotePrices {
    pub bid: Price,
    pub ask: Price,
    pub updated_at_ms: i64,
}

/// Per-market engine state.
#[derive(Debug)]
struct MarketState {
    phase: QuotePhase,
    last_quote: Option<LastQuotePrices>,
    current_ladder: Option<QuoteLadder>,
}

impl MarketState {
    fn new() -> Self {
        Self {
            phase: QuotePhase::NoQuote,
            last_quote: None,
            current_ladder: None,
        }
    }

    /// Suppression keeps `last_quote` so the requote gate stays armed.
    fn suppress(&mut self) {
        self.phase = QuotePhase::Suppressed;
    }
}

/// Orchestrates the decision pipeline for every subscribed market.
pub struct QuoteEngine {
    venue: Arc<dyn VenueClient>,
    spread: SpreadEngine,
    sizer: Sizer,
    shaper: InventoryShaper,
    gate: RiskGate,
    hedge: HedgeExecutor,
    oracle: Option<Arc<PriceOracle>>,
    fallback_to_orderbook: bool,
    maker: MakerConfig,
    market_filter: Option<Vec<u32>>,
    markets: HashMap<MarketId, Market>,
    states: HashMap<MarketId, MarketState>,
    account: AccountView,
    events: Option<mpsc::Receiver<OrderbookSnapshot>>,
}

impl QuoteEngine {
    pub fn new(
        venue: Arc<dyn VenueClient>,
        maker: MakerConfig,
        risk: RiskConfig,
        oracle: Option<Arc<PriceOracle>>,
    ) -> Self {
        let fallback_to_orderbook = oracle
            .as_ref()
            .map(|o| o.config().fallback_to_orderbook)
            .unwrap_or(true);
        Self {
            spread: SpreadEngine::new(maker.spread.clone()),
            sizer: Sizer::new(maker.clone(), risk.clone()),
            shaper: InventoryShaper::new(maker.clone()),
            gate: RiskGate::new(risk),
            hedge: HedgeExecutor::new(venue.clone()),
            oracle,
            fallback_to_orderbook,
            maker,
            market_filter: None,
            markets: HashMap::new(),
            states: HashMap::new(),
            account: AccountView::default(),
            events: None,
            venue,
        }
    }

    /// Restrict quoting to the given market ids.
    pub fn with_market_filter(mut self, markets: Vec<u32>) -> Self {
        self.market_filter = Some(markets);
        self
    }

    /// Load markets, start the oracle refresher, subscribe orderbooks, and
    /// take the event stream. Must run before [`QuoteEngine::run`].
    pub async fn start(&mut self) -> EngineResult<()> {
        let mut markets = self.venue.all_markets().await?;
        if let Some(filter) = &self.market_filter {
            markets.retain(|m| filter.contains(&m.id.index()));
        }
        if markets.is_empty() {
            return Err(EngineError::NoMarkets);
        }

        if let Some(oracle) = &self.oracle {
            if oracle.config().enabled {
                let symbols: Vec<String> = markets
                    .iter()
                    .map(|m| m.base_symbol().to_string())
                    .collect();
                oracle.start_updates(symbols);
            }
        }

        for market in &markets {
            self.venue.subscribe_orderbook(market.id).await?;
            self.states.insert(market.id, MarketState::new());
            info!(market = %market.id, symbol = %market.symbol, "subscribed");
        }
        self.markets = markets.into_iter().map(|m| (m.id, m)).collect();
        self.events = Some(self.venue.orderbook_events()?);

        self.refresh_account().await;
        Ok(())
    }

    /// Drive the engine until `shutdown` fires, then tear down.
    pub async fn run(&mut self, shutdown: CancellationToken) -> EngineResult<()> {
        let mut events = self.events.take().ok_or(EngineError::NotStarted)?;
        let mut tick =
            tokio::time::interval(Duration::from_millis(self.maker.requote_interval_ms.max(1)));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                maybe_book = events.recv() => match maybe_book {
                    Some(book) => self.on_book_event(book).await,
                    None => {
                        warn!("orderbook event stream closed");
                        break;
                    }
                },
                _ = tick.tick() => self.refresh_account().await,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Refresh balances, positions, and margin fraction from the venue.
    ///
    /// Failures leave the previous snapshot in place; the loop continues.
    pub async fn refresh_account(&mut self) {
        match self.venue.fetch_account().await {
            Ok(mut account) => {
                match self.venue.leverage().await {
                    Ok(leverage) => account.margin_fraction = leverage,
                    Err(e) => {
                        warn!(error = %e, "leverage refresh failed");
                        account.margin_fraction = self.account.margin_fraction;
                    }
                }
                self.account = account;
            }
            Err(e) => warn!(error = %e, "account refresh failed"),
        }
    }

    /// One full decision cycle for one orderbook event.
    pub async fn on_book_event(&mut self, book: OrderbookSnapshot) {
        let market_id = book.market;
        let Some(market) = self.markets.get(&market_id).cloned() else {
            debug!(market = %market_id, "event for unknown market dropped");
            return;
        };
        if !self.states.contains_key(&market_id) {
            return;
        }

        if let Err(health) = self.spread.health(&book) {
            debug!(market = %market_id, reason = %health, "quote suppressed: book unhealthy");
            self.suppress(market_id);
            return;
        }

        if let Err(denial) = self.gate.can_quote(&self.account, market_id) {
            info!(
                market = %market_id,
                reason = denial.reason,
                detail = %denial.detail,
                "quote suppressed: risk denied"
            );
            self.suppress(market_id);
            return;
        }

        let Some(reference) = self.reference_price(&market, &book) else {
            debug!(market = %market_id, "quote suppressed: no reference price");
            self.suppress(market_id);
            return;
        };

        let depth = self.spread.dynamic_spread(&book);
        let shaped = self.shaper.shape(
            &self.gate,
            &self.account,
            market_id,
            reference,
            depth.spread,
        );

        // Requote gate: both targets must move past the threshold before we
        // replace resting orders. The first quote always goes out.
        if let Some(state) = self.states.get_mut(&market_id) {
            if let Some(prev) = state.last_quote {
                let bid_delta = shaped.bid_price.frac_change_from(prev.bid).unwrap_or(1.0);
                let ask_delta = shaped.ask_price.frac_change_from(prev.ask).unwrap_or(1.0);
                if bid_delta <= self.maker.requote_threshold
                    && ask_delta <= self.maker.requote_threshold
                {
                    debug!(
                        market = %market_id,
                        bid_delta,
                        ask_delta,
                        "requote gate held: move below threshold"
                    );
                    return;
                }
            }
            state.last_quote = Some(LastQuotePrices {
                bid: shaped.bid_price,
                ask: shaped.ask_price,
                updated_at_ms: now_ms(),
            });
        }

        // Cancels go out before new placements without waiting for
        // confirmation, so both generations can briefly rest at the venue.
        if let Err(e) = self.venue.cancel_all_orders(Some(market_id)).await {
            warn!(market = %market_id, error = %e, "cancel before requote failed");
        }

        let sizes = self.sizer.level_sizes(&self.account);
        if sizes.is_empty() {
            info!(market = %market_id, "quote suppressed: no sizes");
            self.suppress(market_id);
            return;
        }
        if let Err(e) = self.sizer.validate_sizes(&sizes, &self.account, reference) {
            info!(market = %market_id, reason = %e, "quote suppressed: sizes rejected");
            self.suppress(market_id);
            return;
        }

        let ladder = build_ladder(
            market_id,
            &shaped.bid_price,
            &shaped.ask_price,
            depth.spread,
            &sizes,
            self.maker.max_levels,
        );
        self.place_ladder(&market, &ladder).await;

        if let Some(state) = self.states.get_mut(&market_id) {
            state.current_ladder = Some(ladder);
            state.phase = QuotePhase::Quoting;
        }

        debug!(
            market = %market_id,
            reference = %reference,
            spread = depth.spread,
            imbalance = depth.imbalance,
            skew = shaped.skew_factor,
            bias = shaped.bias,
            "quote cycle complete"
        );

        if self
            .shaper
            .needs_hedge(&self.gate, &self.account, market_id, reference)
        {
            if let Some(position) = self.account.position(market_id) {
                self.hedge.hedge(position).await;
            }
        }
    }

    /// Resolve the reference price: fresh oracle mid first, then orderbook
    /// mid when fallback is allowed.
    fn reference_price(&self, market: &Market, book: &OrderbookSnapshot) -> Option<Price> {
        if let Some(oracle) = &self.oracle {
            if oracle.config().enabled {
                let symbol = market.base_symbol();
                if oracle.is_fresh(symbol) {
                    if let Some(price) = oracle.cached(symbol) {
                        return Some(Price::new(price.mid));
                    }
                }
            }
        }
        if self.fallback_to_orderbook {
            return self.spread.mid(book);
        }
        None
    }

    /// Emit every rung of the ladder, rounding price and size for the
    /// market. One rejected order does not abort the rest.
    async fn place_ladder(&self, market: &Market, ladder: &QuoteLadder) {
        let step = Size::new(SIZE_STEP);
        let rungs = ladder
            .bids
            .iter()
            .map(|l| (maker_core::Side::Bid, l))
            .chain(ladder.asks.iter().map(|l| (maker_core::Side::Ask, l)));

        for (side, level) in rungs {
            let price = level.price.round_to_tick(market.tick_size);
            let size = level.size.round_for_order(market.min_size, step);
            let intent = OrderIntent::limit(market.id, side, price, size);
            match self.venue.place_order(&intent).await {
                Ok(order_id) => {
                    debug!(market = %market.id, %side, %price, %size, %order_id, "order placed")
                }
                Err(e) => {
                    warn!(market = %market.id, %side, %price, error = %e, "order failed; ladder continues")
                }
            }
        }
    }

    fn suppress(&mut self, market: MarketId) {
        if let Some(state) = self.states.get_mut(&market) {
            state.suppress();
        }
    }

    /// Stop the oracle, cancel everything resting, unsubscribe all markets.
    /// Errors are logged; the remaining steps still run.
    pub async fn shutdown(&mut self) {
        if let Some(oracle) = &self.oracle {
            oracle.stop();
        }
        if let Err(e) = self.venue.cancel_all_orders(None).await {
            warn!(error = %e, "emergency cancel-all failed during shutdown");
        }
        for market in self.markets.keys() {
            if let Err(e) = self.venue.unsubscribe_orderbook(*market).await {
                warn!(market = %market, error = %e, "unsubscribe failed during shutdown");
            }
        }
        self.states.clear();
        info!("engine shut down");
    }

    /// Current phase for a market, if subscribed.
    pub fn phase(&self, market: MarketId) -> Option<QuotePhase> {
        self.states.get(&market).map(|s| s.phase)
    }

    /// Last placed quote prices for a market.
    pub fn last_quote(&self, market: MarketId) -> Option<LastQuotePrices> {
        self.states.get(&market).and_then(|s| s.last_quote)
    }

    /// The ladder the engine believes is resting.
    pub fn current_ladder(&self, market: MarketId) -> Option<&QuoteLadder> {
        self.states.get(&market).and_then(|s| s.current_ladder.as_ref())
    }

    /// Latest account snapshot (for the CLI's status output).
    pub fn account(&self) -> &AccountView {
        &self.account
    }
}

/// Build the two-sided ladder: level i sits `spread * (i + 1) * 0.5` beyond
/// the shaped bid/ask.
fn build_ladder(
    market: MarketId,
    bid_price: &Price,
    ask_price: &Price,
    spread: f64,
    sizes: &[Size],
    max_levels: usize,
) -> QuoteLadder {
    let levels = max_levels.min(sizes.len());
    let mut bids = Vec::with_capacity(levels);
    let mut asks = Vec::with_capacity(levels);

    for (i, size) in sizes.iter().take(levels).enumerate() {
        let spacing = spread * (i + 1) as f64 * LEVEL_SPACING_FACTOR;
        bids.push(QuoteLevel {
            price: *bid_price * (1.0 - spacing),
            size: *size,
        });
        asks.push(QuoteLevel {
            price: *ask_price * (1.0 + spacing),
            size: *size,
        });
    }

    QuoteLadder {
        market,
        bids,
        asks,
        generated_at_ms: now_ms(),
    }
}

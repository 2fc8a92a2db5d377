//! End-to-end quote loop test against the paper venue.

use maker_core::{
    AccountView, Balance, BookLevel, Market, MarketId, OrderbookSnapshot, Price, Size,
};
use maker_engine::QuoteEngine;
use maker_mm::MakerConfig;
use maker_risk::RiskConfig;
use maker_venue::{PaperVenue, VenueClient};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn sol_market() -> Market {
    Market {
        id: MarketId::new(0),
        symbol: "SOL-PERP".to_string(),
        tick_size: Price::new(0.001),
        min_size: Size::new(0.01),
        max_leverage: 20.0,
    }
}

fn funded_account() -> AccountView {
    AccountView {
        balance: Balance::new(10_000.0, 5_000.0),
        positions: Default::default(),
        margin_fraction: 1.0,
    }
}

fn healthy_book(mid: f64) -> OrderbookSnapshot {
    let mut book = OrderbookSnapshot::new(MarketId::new(0), maker_core::now_ms());
    book.bids = vec![
        BookLevel::new(mid - 0.1, 10.0),
        BookLevel::new(mid - 0.2, 10.0),
    ];
    book.asks = vec![
        BookLevel::new(mid + 0.1, 10.0),
        BookLevel::new(mid + 0.2, 10.0),
    ];
    book
}

async fn wait_for<F: Fn() -> bool>(predicate: F) -> bool {
    for _ in 0..100 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn quote_loop_places_ladder_and_cleans_up_on_shutdown() {
    let venue = Arc::new(PaperVenue::new(vec![sol_market()]));
    venue.set_account(funded_account());
    venue.set_leverage(1.0);

    let maker = MakerConfig {
        max_levels: 3,
        fixed_size: 0.1,
        requote_threshold: 0.0002,
        ..Default::default()
    };
    let mut engine = QuoteEngine::new(venue.clone(), maker, RiskConfig::default(), None);
    engine.start().await.unwrap();
    assert_eq!(venue.subscriptions(), vec![MarketId::new(0)]);

    let shutdown = CancellationToken::new();
    let loop_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            engine.run(shutdown).await.unwrap();
        }
    });

    // First event: a full 3x2 ladder rests at the venue.
    venue.push_book(healthy_book(100.0)).await;
    let venue_for_wait = venue.clone();
    assert!(
        wait_for(move || venue_for_wait.open_orders().len() == 6).await,
        "ladder never placed"
    );

    // A large move replaces the ladder rather than stacking a second one.
    venue.push_book(healthy_book(102.0)).await;
    let venue_for_wait = venue.clone();
    assert!(
        wait_for(move || venue_for_wait.placements().len() == 12).await,
        "requote never happened"
    );
    assert_eq!(venue.open_orders().len(), 6);

    // Shutdown cancels everything resting and unsubscribes.
    shutdown.cancel();
    loop_handle.await.unwrap();
    assert!(venue.open_orders().is_empty());
    assert!(venue.subscriptions().is_empty());
}

#[tokio::test]
async fn events_for_other_markets_are_ignored() {
    let venue = Arc::new(PaperVenue::new(vec![sol_market()]));
    venue.set_account(funded_account());
    venue.set_leverage(1.0);

    let mut engine = QuoteEngine::new(
        venue.clone(),
        MakerConfig::default(),
        RiskConfig::default(),
        None,
    );
    engine.start().await.unwrap();

    let shutdown = CancellationToken::new();
    let loop_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            engine.run(shutdown).await.unwrap();
        }
    });

    // Subscribe the unknown market directly at the venue so the event
    // reaches the engine, which must drop it.
    venue.subscribe_orderbook(MarketId::new(9)).await.unwrap();
    let mut stray = healthy_book(100.0);
    stray.market = MarketId::new(9);
    venue.push_book(stray).await;

    venue.push_book(healthy_book(100.0)).await;
    let venue_for_wait = venue.clone();
    assert!(wait_for(move || !venue_for_wait.open_orders().is_empty()).await);

    // Only market 0 orders exist.
    assert!(venue
        .open_orders()
        .iter()
        .all(|o| o.market == MarketId::new(0)));

    shutdown.cancel();
    loop_handle.await.unwrap();
}

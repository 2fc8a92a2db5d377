//! In-process paper venue.
//!
//! Serves a fixed market listing, accepts and tracks orders, and forwards
//! caller-injected orderbook snapshots for subscribed markets. Used by the
//! engine's tests and by `live --test` dry runs. Nothing ever fills here;
//! fills belong to the backtest engine.

use crate::client::{BoxFuture, VenueClient};
use crate::error::{VenueError, VenueResult};
use maker_core::{
    AccountView, Market, MarketId, OrderId, OrderIntent, OrderbookSnapshot, RestingOrder,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

const EVENT_BUFFER: usize = 256;

/// Paper venue state.
pub struct PaperVenue {
    markets: Vec<Market>,
    account: RwLock<AccountView>,
    leverage: RwLock<f64>,
    subscribed: Mutex<HashSet<MarketId>>,
    next_order_id: AtomicU64,
    orders: Mutex<Vec<RestingOrder>>,
    /// Every intent ever accepted, for assertions.
    placements: Mutex<Vec<OrderIntent>>,
    /// When set, `place_order` rejects. Lets tests exercise error isolation.
    reject_orders: AtomicBool,
    book_tx: mpsc::Sender<OrderbookSnapshot>,
    book_rx: Mutex<Option<mpsc::Receiver<OrderbookSnapshot>>>,
}

impl PaperVenue {
    pub fn new(markets: Vec<Market>) -> Self {
        let (book_tx, book_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            markets,
            account: RwLock::new(AccountView::default()),
            leverage: RwLock::new(1.0),
            subscribed: Mutex::new(HashSet::new()),
            next_order_id: AtomicU64::new(1),
            orders: Mutex::new(Vec::new()),
            placements: Mutex::new(Vec::new()),
            reject_orders: AtomicBool::new(false),
            book_tx,
            book_rx: Mutex::new(Some(book_rx)),
        }
    }

    /// Replace the account snapshot returned by `fetch_account`.
    pub fn set_account(&self, account: AccountView) {
        *self.account.write() = account;
    }

    /// Set the value `leverage()` reports.
    pub fn set_leverage(&self, leverage: f64) {
        *self.leverage.write() = leverage;
    }

    /// Make subsequent `place_order` calls fail.
    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Inject a book event; dropped unless the market is subscribed.
    pub async fn push_book(&self, book: OrderbookSnapshot) {
        if !self.subscribed.lock().contains(&book.market) {
            debug!(market = %book.market, "book for unsubscribed market dropped");
            return;
        }
        // Receiver dropped means the engine is gone; nothing to deliver to.
        let _ = self.book_tx.send(book).await;
    }

    /// Orders currently resting.
    pub fn open_orders(&self) -> Vec<RestingOrder> {
        self.orders.lock().clone()
    }

    /// All intents accepted so far.
    pub fn placements(&self) -> Vec<OrderIntent> {
        self.placements.lock().clone()
    }

    /// Markets currently subscribed.
    pub fn subscriptions(&self) -> Vec<MarketId> {
        self.subscribed.lock().iter().copied().collect()
    }
}

impl VenueClient for PaperVenue {
    fn all_markets(&self) -> BoxFuture<'_, VenueResult<Vec<Market>>> {
        Box::pin(async move { Ok(self.markets.clone()) })
    }

    fn subscribe_orderbook(&self, market: MarketId) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            self.subscribed.lock().insert(market);
            Ok(())
        })
    }

    fn unsubscribe_orderbook(&self, market: MarketId) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            self.subscribed.lock().remove(&market);
            Ok(())
        })
    }

    fn orderbook_events(&self) -> VenueResult<mpsc::Receiver<OrderbookSnapshot>> {
        self.book_rx
            .lock()
            .take()
            .ok_or(VenueError::EventsAlreadyTaken)
    }

    fn fetch_account(&self) -> BoxFuture<'_, VenueResult<AccountView>> {
        Box::pin(async move { Ok(self.account.read().clone()) })
    }

    fn leverage(&self) -> BoxFuture<'_, VenueResult<f64>> {
        Box::pin(async move { Ok(*self.leverage.read()) })
    }

    fn place_order(&self, intent: &OrderIntent) -> BoxFuture<'_, VenueResult<OrderId>> {
        let intent = intent.clone();
        Box::pin(async move {
            if self.reject_orders.load(Ordering::SeqCst) {
                return Err(VenueError::Rejected("paper venue set to reject".to_string()));
            }
            let id = OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst));
            let order = RestingOrder::from_intent(id, &intent, maker_core::now_ms());
            self.orders.lock().push(order);
            self.placements.lock().push(intent);
            Ok(id)
        })
    }

    fn cancel_order(&self, id: OrderId) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            let mut orders = self.orders.lock();
            let before = orders.len();
            orders.retain(|o| o.id != id);
            if orders.len() == before {
                return Err(VenueError::Rejected(format!("unknown order {id}")));
            }
            Ok(())
        })
    }

    fn cancel_all_orders(&self, market: Option<MarketId>) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            let mut orders = self.orders.lock();
            match market {
                Some(m) => orders.retain(|o| o.market != m),
                None => orders.clear(),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maker_core::{Price, Side, Size};

    fn markets() -> Vec<Market> {
        vec![Market {
            id: MarketId::new(0),
            symbol: "SOL-PERP".to_string(),
            tick_size: Price::new(0.01),
            min_size: Size::new(0.1),
            max_leverage: 20.0,
        }]
    }

    fn intent() -> OrderIntent {
        OrderIntent::limit(
            MarketId::new(0),
            Side::Bid,
            Price::new(99.9),
            Size::new(1.0),
        )
    }

    #[tokio::test]
    async fn test_place_and_cancel_order() {
        let venue = PaperVenue::new(markets());
        let id = venue.place_order(&intent()).await.unwrap();
        assert_eq!(venue.open_orders().len(), 1);

        venue.cancel_order(id).await.unwrap();
        assert!(venue.open_orders().is_empty());

        // Unknown id is rejected.
        assert!(venue.cancel_order(id).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_all_scoped_by_market() {
        let venue = PaperVenue::new(markets());
        venue.place_order(&intent()).await.unwrap();
        let other = OrderIntent::limit(
            MarketId::new(1),
            Side::Ask,
            Price::new(100.1),
            Size::new(1.0),
        );
        venue.place_order(&other).await.unwrap();

        venue.cancel_all_orders(Some(MarketId::new(0))).await.unwrap();
        let remaining = venue.open_orders();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].market, MarketId::new(1));
    }

    #[tokio::test]
    async fn test_books_only_flow_when_subscribed() {
        let venue = PaperVenue::new(markets());
        let mut events = venue.orderbook_events().unwrap();

        // Unsubscribed: dropped.
        venue.push_book(OrderbookSnapshot::new(MarketId::new(0), 1)).await;

        venue.subscribe_orderbook(MarketId::new(0)).await.unwrap();
        venue.push_book(OrderbookSnapshot::new(MarketId::new(0), 2)).await;

        let delivered = events.recv().await.unwrap();
        assert_eq!(delivered.timestamp_ms, 2);
    }

    #[tokio::test]
    async fn test_event_stream_single_registration() {
        let venue = PaperVenue::new(markets());
        assert!(venue.orderbook_events().is_ok());
        assert!(matches!(
            venue.orderbook_events(),
            Err(VenueError::EventsAlreadyTaken)
        ));
    }

    #[tokio::test]
    async fn test_reject_flag() {
        let venue = PaperVenue::new(markets());
        venue.set_reject_orders(true);
        assert!(venue.place_order(&intent()).await.is_err());
        venue.set_reject_orders(false);
        assert!(venue.place_order(&intent()).await.is_ok());
    }
}

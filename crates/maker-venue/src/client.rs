//! The venue SDK contract the engine consumes.

use crate::error::VenueResult;
use maker_core::{AccountView, Market, MarketId, OrderId, OrderIntent, OrderbookSnapshot};
use std::pin::Pin;
use tokio::sync::mpsc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Venue access contract.
///
/// Orderbook events are delivered through a single receiver obtained once
/// via [`VenueClient::orderbook_events`]; events for one market arrive in
/// order and the engine drains them serially. Everything else is
/// request/response.
pub trait VenueClient: Send + Sync {
    /// Static market listing.
    fn all_markets(&self) -> BoxFuture<'_, VenueResult<Vec<Market>>>;

    /// Begin orderbook delivery for a market.
    fn subscribe_orderbook(&self, market: MarketId) -> BoxFuture<'_, VenueResult<()>>;

    /// Stop orderbook delivery for a market.
    fn unsubscribe_orderbook(&self, market: MarketId) -> BoxFuture<'_, VenueResult<()>>;

    /// Take the orderbook event stream. Single registration: the second call
    /// fails with [`crate::VenueError::EventsAlreadyTaken`].
    fn orderbook_events(&self) -> VenueResult<mpsc::Receiver<OrderbookSnapshot>>;

    /// Refresh balances and positions.
    fn fetch_account(&self) -> BoxFuture<'_, VenueResult<AccountView>>;

    /// Venue-reported account leverage, used as the margin fraction.
    fn leverage(&self) -> BoxFuture<'_, VenueResult<f64>>;

    /// Place one order; returns the venue-assigned id.
    fn place_order(&self, intent: &OrderIntent) -> BoxFuture<'_, VenueResult<OrderId>>;

    /// Cancel one order by id.
    fn cancel_order(&self, id: OrderId) -> BoxFuture<'_, VenueResult<()>>;

    /// Cancel every resting order, optionally scoped to one market.
    fn cancel_all_orders(&self, market: Option<MarketId>) -> BoxFuture<'_, VenueResult<()>>;
}

//! Thin websocket adapter for a live venue gateway.
//!
//! Speaks the gateway's JSON protocol: outbound frames are
//! `{"id", "method", "params"}` requests, inbound frames are either
//! `{"id", "result" | "error"}` replies or `{"channel": "orderbook", "data"}`
//! pushes. Replies are correlated to callers by id; pushes feed the single
//! orderbook event stream.
//!
//! Deliberately thin: no reconnection, no heartbeat management. A dropped
//! connection fails pending requests and closes the event stream; the
//! supervisor decides whether to restart the process.

use crate::client::{BoxFuture, VenueClient};
use crate::error::{VenueError, VenueResult};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use maker_core::{
    AccountView, Balance, BookLevel, Market, MarketId, OrderId, OrderIntent, OrderbookSnapshot,
    Position, Price, Size,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

const EVENT_BUFFER: usize = 256;
const OUTBOUND_BUFFER: usize = 256;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type Pending = Arc<DashMap<u64, oneshot::Sender<Result<Value, String>>>>;

/// Live venue connection.
pub struct WsVenue {
    out_tx: mpsc::Sender<Message>,
    pending: Pending,
    next_id: AtomicU64,
    book_rx: Mutex<Option<mpsc::Receiver<OrderbookSnapshot>>>,
}

impl WsVenue {
    /// Connect and authenticate against the gateway at `url`.
    pub async fn connect(url: &str, private_key: &str) -> VenueResult<Self> {
        let (stream, _) = connect_async(url).await?;
        let (mut sink, mut read) = stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
        let (book_tx, book_rx) = mpsc::channel(EVENT_BUFFER);
        let pending: Pending = Arc::new(DashMap::new());

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    warn!(error = %e, "venue write failed, stopping writer");
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let pong_tx = out_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match parse_server_message(&text) {
                        Some(ServerEvent::Book(book)) => {
                            if book_tx.send(book).await.is_err() {
                                break;
                            }
                        }
                        Some(ServerEvent::Reply { id, result }) => {
                            if let Some((_, tx)) = reader_pending.remove(&id) {
                                let _ = tx.send(result);
                            }
                        }
                        None => debug!(frame = %text, "unrecognized venue frame"),
                    },
                    Ok(Message::Ping(payload)) => {
                        let _ = pong_tx.send(Message::Pong(payload)).await;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "venue read failed");
                        break;
                    }
                }
            }
            // Connection gone: fail whatever is still waiting.
            for entry in reader_pending.iter() {
                debug!(id = *entry.key(), "failing pending request on close");
            }
            reader_pending.clear();
        });

        let venue = Self {
            out_tx,
            pending,
            next_id: AtomicU64::new(1),
            book_rx: Mutex::new(Some(book_rx)),
        };
        venue.request("auth", json!({ "key": private_key })).await?;
        Ok(venue)
    }

    async fn request(&self, method: &str, params: Value) -> VenueResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params });
        if self
            .out_tx
            .send(Message::Text(frame.to_string()))
            .await
            .is_err()
        {
            self.pending.remove(&id);
            return Err(VenueError::Closed);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Err(_) => {
                self.pending.remove(&id);
                Err(VenueError::Timeout)
            }
            Ok(Err(_)) => Err(VenueError::Closed),
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(VenueError::Rejected(message)),
        }
    }

    async fn typed_request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> VenueResult<T> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| VenueError::BadPayload(e.to_string()))
    }
}

impl VenueClient for WsVenue {
    fn all_markets(&self) -> BoxFuture<'_, VenueResult<Vec<Market>>> {
        Box::pin(async move {
            let wires: Vec<WireMarket> = self.typed_request("markets", json!({})).await?;
            Ok(wires.into_iter().map(WireMarket::into_market).collect())
        })
    }

    fn subscribe_orderbook(&self, market: MarketId) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            self.request("subscribeOrderbook", json!({ "market": market.index() }))
                .await?;
            Ok(())
        })
    }

    fn unsubscribe_orderbook(&self, market: MarketId) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            self.request("unsubscribeOrderbook", json!({ "market": market.index() }))
                .await?;
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
        Box::pin(async move {
            let wire: WireAccount = self.typed_request("account", json!({})).await?;
            Ok(wire.into_view())
        })
    }

    fn leverage(&self) -> BoxFuture<'_, VenueResult<f64>> {
        Box::pin(async move { self.typed_request("leverage", json!({})).await })
    }

    fn place_order(&self, intent: &OrderIntent) -> BoxFuture<'_, VenueResult<OrderId>> {
        let params = serde_json::to_value(intent).unwrap_or(Value::Null);
        Box::pin(async move {
            let reply: WireOrderAck = self.typed_request("placeOrder", params).await?;
            Ok(OrderId(reply.order_id))
        })
    }

    fn cancel_order(&self, id: OrderId) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            self.request("cancelOrder", json!({ "orderId": id.0 })).await?;
            Ok(())
        })
    }

    fn cancel_all_orders(&self, market: Option<MarketId>) -> BoxFuture<'_, VenueResult<()>> {
        Box::pin(async move {
            self.request(
                "cancelAllOrders",
                json!({ "market": market.map(|m| m.index()) }),
            )
            .await?;
            Ok(())
        })
    }
}

/// Parsed inbound frame.
enum ServerEvent {
    Book(OrderbookSnapshot),
    Reply {
        id: u64,
        result: Result<Value, String>,
    },
}

fn parse_server_message(text: &str) -> Option<ServerEvent> {
    let value: Value = serde_json::from_str(text).ok()?;

    if value.get("channel").and_then(Value::as_str) == Some("orderbook") {
        let wire: WireBook = serde_json::from_value(value.get("data")?.clone()).ok()?;
        return Some(ServerEvent::Book(wire.into_snapshot()));
    }

    let id = value.get("id")?.as_u64()?;
    let result = match value.get("error").and_then(Value::as_str) {
        Some(message) => Err(message.to_string()),
        None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
    };
    Some(ServerEvent::Reply { id, result })
}

#[derive(Debug, Deserialize)]
struct WireMarket {
    id: u32,
    symbol: String,
    #[serde(rename = "tickSize")]
    tick_size: f64,
    #[serde(rename = "minSize")]
    min_size: f64,
    #[serde(rename = "maxLeverage")]
    max_leverage: f64,
}

impl WireMarket {
    fn into_market(self) -> Market {
        Market {
            id: MarketId::new(self.id),
            symbol: self.symbol,
            tick_size: Price::new(self.tick_size),
            min_size: Size::new(self.min_size),
            max_leverage: self.max_leverage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireBook {
    market: u32,
    timestamp: i64,
    /// `[price, size]` pairs, best first.
    bids: Vec<(f64, f64)>,
    asks: Vec<(f64, f64)>,
}

impl WireBook {
    fn into_snapshot(self) -> OrderbookSnapshot {
        let mut snapshot = OrderbookSnapshot::new(MarketId::new(self.market), self.timestamp);
        snapshot.bids = self
            .bids
            .into_iter()
            .map(|(p, s)| BookLevel::new(p, s))
            .collect();
        snapshot.asks = self
            .asks
            .into_iter()
            .map(|(p, s)| BookLevel::new(p, s))
            .collect();
        snapshot
    }
}

#[derive(Debug, Deserialize)]
struct WireOrderAck {
    #[serde(rename = "orderId")]
    order_id: u64,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    balance: WireBalance,
    positions: Vec<WirePosition>,
    #[serde(rename = "marginFraction", default)]
    margin_fraction: f64,
}

#[derive(Debug, Deserialize)]
struct WireBalance {
    total: f64,
    available: f64,
}

#[derive(Debug, Deserialize)]
struct WirePosition {
    market: u32,
    size: f64,
    #[serde(rename = "entryPrice")]
    entry_price: f64,
    #[serde(rename = "unrealizedPnl", default)]
    unrealized_pnl: f64,
}

impl WireAccount {
    fn into_view(self) -> AccountView {
        let mut view = AccountView {
            balance: Balance::new(self.balance.total, self.balance.available),
            positions: Default::default(),
            margin_fraction: self.margin_fraction,
        };
        for p in self.positions {
            let market = MarketId::new(p.market);
            view.positions.insert(
                market,
                Position {
                    market,
                    size: p.size,
                    entry_price: Price::new(p.entry_price),
                    unrealized_pnl: p.unrealized_pnl,
                },
            );
        }
        view
    }
}

//! Hedge execution.
//!
//! When the inventory shaper flags an imbalance, a single reduce-only
//! market order offloads 30% of the open position. Hedging is advisory:
//! venue failures are logged and swallowed, quoting continues either way.

use maker_core::{OrderIntent, Position, Side, Size};
use maker_mm::inventory::HEDGE_RATIO;
use maker_venue::VenueClient;
use std::sync::Arc;
use tracing::{info, warn};

/// Emits reduce-only hedge orders.
pub struct HedgeExecutor {
    venue: Arc<dyn VenueClient>,
}

impl HedgeExecutor {
    pub fn new(venue: Arc<dyn VenueClient>) -> Self {
        Self { venue }
    }

    /// Hedge `position` by selling (long) or buying (short) 30% of it.
    pub async fn hedge(&self, position: &Position) {
        if position.is_flat() {
            return;
        }
        let side = if position.size > 0.0 {
            Side::Ask
        } else {
            Side::Bid
        };
        let size = Size::new(position.size.abs() * HEDGE_RATIO);
        let intent = OrderIntent::reduce_only_market(position.market, side, size);

        match self.venue.place_order(&intent).await {
            Ok(order_id) => info!(
                market = %position.market,
                %side,
                size = %size,
                %order_id,
                "hedge order placed"
            ),
            Err(e) => warn!(
                market = %position.market,
                %side,
                error = %e,
                "hedge order failed; continuing"
            ),
        }
    }
}

//! Paper Trading Gateway
//!
//! Fills orders instantly at a per-symbol reference price with a little
//! random jitter, so the whole stack runs without venue credentials.
//! Keeps the venue contract honest: executions are keyed by client order
//! id, so resubmitting an id replays the recorded fill instead of
//! executing twice, and `recent_orders` serves reconciliation from the
//! recorded history.

use crate::domain::errors::GatewayError;
use crate::domain::ports::{ExchangeGateway, VenueCredentials};
use crate::domain::trading::types::{Fill, OrderStatus, ValidatedOrder, VenueOrder};
use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// A scripted failure for the next `submit` call. Lets tests and demos
/// drive the gateway through the same failure classes the live venue
/// produces.
#[derive(Debug, Clone, Copy)]
pub enum PaperFault {
    /// Execute the order, then lose the response on the way back.
    DropResponse,
    /// Refuse the order at the venue gate; nothing executes.
    Reject,
    /// Fail the request's authentication; nothing executes.
    AuthFailure,
}

pub struct PaperGateway {
    fills: RwLock<HashMap<String, Fill>>,
    history: RwLock<Vec<VenueOrder>>,
    faults: Mutex<VecDeque<PaperFault>>,
    next_venue_id: AtomicU64,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self {
            fills: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            faults: Mutex::new(VecDeque::new()),
            next_venue_id: AtomicU64::new(1),
        }
    }

    /// Queue a failure for an upcoming `submit`. Faults are consumed in
    /// order, one per call.
    pub async fn inject_fault(&self, fault: PaperFault) {
        self.faults.lock().await.push_back(fault);
    }

    /// Execute `order` at the jittered reference price and record it.
    /// Returns the recorded fill unchanged if the id was executed before.
    async fn execute(&self, order: &ValidatedOrder) -> Fill {
        {
            let fills = self.fills.read().await;
            if let Some(existing) = fills.get(&order.id) {
                info!("PaperGateway: replaying recorded fill for {}", order.id);
                return existing.clone();
            }
        }

        let price = jittered(reference_price(&order.symbol));
        let venue_order_id = self.next_venue_id.fetch_add(1, Ordering::SeqCst);

        let fill = Fill {
            price,
            quantity: order.quantity,
            venue_order_id: venue_order_id.to_string(),
            raw: json!({
                "venue": "paper",
                "orderId": venue_order_id,
                "clientOrderId": order.id,
                "status": "FILLED",
                "executedQty": order.quantity.to_string(),
                "price": price.to_string(),
            }),
        };

        {
            let mut fills = self.fills.write().await;
            // Checked again under the write lock: two concurrent retries
            // of one id must not both record.
            if let Some(existing) = fills.get(&order.id) {
                return existing.clone();
            }
            fills.insert(order.id.clone(), fill.clone());
        }

        self.history.write().await.push(VenueOrder {
            client_order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            status: OrderStatus::Filled,
            price: Some(price),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });

        info!(
            "PaperGateway: filled {} {} {} at {}",
            order.side, order.quantity, order.symbol, price
        );

        fill
    }
}

impl Default for PaperGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeGateway for PaperGateway {
    async fn submit(&self, order: &ValidatedOrder) -> Result<Fill, GatewayError> {
        let fault = self.faults.lock().await.pop_front();

        match fault {
            None => Ok(self.execute(order).await),
            Some(PaperFault::DropResponse) => {
                // The venue executed; the caller just never hears back.
                let _ = self.execute(order).await;
                Err(GatewayError::NetworkTimeout {
                    reason: "paper fault: response dropped".to_string(),
                })
            }
            Some(PaperFault::Reject) => Err(GatewayError::VenueRejected {
                code: -2010,
                reason: "paper fault: order refused".to_string(),
            }),
            Some(PaperFault::AuthFailure) => Err(GatewayError::AuthFailure {
                reason: "paper fault: bad credentials".to_string(),
            }),
        }
    }

    async fn recent_orders(&self, symbol: &str) -> Result<Vec<VenueOrder>, GatewayError> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|order| order.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn refresh_credentials(
        &self,
        _credentials: VenueCredentials,
    ) -> Result<(), GatewayError> {
        // No keys to install; accepting keeps halt recovery identical to
        // the live venue.
        Ok(())
    }
}

fn reference_price(symbol: &str) -> Decimal {
    if symbol.contains("BTC") {
        dec!(96000)
    } else if symbol.contains("ETH") {
        dec!(3400)
    } else if symbol.contains("AVAX") {
        dec!(40)
    } else {
        dec!(150)
    }
}

/// Reference price with up to 0.1% of simulated spread noise either way.
fn jittered(price: Decimal) -> Decimal {
    let mut rng = rand::rng();
    let noise = rng.random_range(-0.001..=0.001);
    let multiplier = Decimal::from_f64(1.0 + noise).unwrap_or(Decimal::ONE);
    (price * multiplier).round_dp(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::OrderSide;

    fn order(symbol: &str, quantity: Decimal) -> ValidatedOrder {
        ValidatedOrder::new(symbol, OrderSide::Buy, quantity)
    }

    #[tokio::test]
    async fn test_fill_tracks_reference_price() {
        let gateway = PaperGateway::new();

        let fill = gateway.submit(&order("BTCUSDT", dec!(0.01))).await.unwrap();

        assert_eq!(fill.quantity, dec!(0.01));
        assert!(fill.price >= dec!(95904) && fill.price <= dec!(96096));
    }

    #[tokio::test]
    async fn test_same_order_id_never_double_fills() {
        let gateway = PaperGateway::new();
        let order = order("ETHUSDT", dec!(0.1));

        let first = gateway.submit(&order).await.unwrap();
        let second = gateway.submit(&order).await.unwrap();

        assert_eq!(first.venue_order_id, second.venue_order_id);
        assert_eq!(first.price, second.price);
        assert_eq!(gateway.recent_orders("ETHUSDT").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_response_executed_and_recoverable() {
        let gateway = PaperGateway::new();
        let order = order("BTCUSDT", dec!(0.02));

        gateway.inject_fault(PaperFault::DropResponse).await;
        let err = gateway.submit(&order).await.unwrap_err();
        assert!(matches!(err, GatewayError::NetworkTimeout { .. }));

        // The venue side executed: history shows it, and a retry with the
        // same id replays the original execution.
        let history = gateway.recent_orders("BTCUSDT").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].client_order_id, order.id);

        let replayed = gateway.submit(&order).await.unwrap();
        assert_eq!(replayed.price, history[0].price.unwrap());
        assert_eq!(gateway.recent_orders("BTCUSDT").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_executes_nothing() {
        let gateway = PaperGateway::new();

        gateway.inject_fault(PaperFault::Reject).await;
        let err = gateway.submit(&order("BTCUSDT", dec!(0.01))).await.unwrap_err();

        assert!(matches!(err, GatewayError::VenueRejected { code: -2010, .. }));
        assert!(gateway.recent_orders("BTCUSDT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auth_fault_executes_nothing() {
        let gateway = PaperGateway::new();

        gateway.inject_fault(PaperFault::AuthFailure).await;
        let err = gateway.submit(&order("BTCUSDT", dec!(0.01))).await.unwrap_err();

        assert!(matches!(err, GatewayError::AuthFailure { .. }));
        assert!(gateway.recent_orders("BTCUSDT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_orders_filters_by_symbol() {
        let gateway = PaperGateway::new();

        gateway.submit(&order("BTCUSDT", dec!(0.01))).await.unwrap();
        gateway.submit(&order("ETHUSDT", dec!(0.1))).await.unwrap();

        let btc = gateway.recent_orders("BTCUSDT").await.unwrap();
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[0].symbol, "BTCUSDT");
    }
}

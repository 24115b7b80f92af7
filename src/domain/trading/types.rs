use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = ();

    /// The dashboard sends the side as a raw string; accept any casing of
    /// BUY/SELL and nothing else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(()),
        }
    }
}

/// Lifecycle state of an order. `Pending` exists only while a submission is
/// in flight; the three terminal states admit no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "FILLED" => Ok(OrderStatus::Filled),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "FAILED" => Ok(OrderStatus::Failed),
            _ => Err(()),
        }
    }
}

/// Raw order request as the dashboard submits it over the RPC boundary.
///
/// The side arrives as an unparsed string (`orderType` in the wire payload);
/// turning it into an [`OrderSide`] is the validator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_type: String,
    pub symbol: String,
    pub quantity: Decimal,
}

impl OrderRequest {
    pub fn new(order_type: impl Into<String>, symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            order_type: order_type.into(),
            symbol: symbol.into(),
            quantity,
        }
    }
}

/// An order that passed validation. Carries the freshly generated client
/// order id, which doubles as the venue idempotency key: a retried
/// submission with the same id can never fill twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedOrder {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub requested_at: i64,
}

impl ValidatedOrder {
    pub fn new(symbol: impl Into<String>, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            quantity,
            requested_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Venue confirmation that an order executed.
///
/// Market orders can execute across several price levels in one shot; the
/// gateway folds those into a single volume-weighted `price`. `raw` keeps
/// the venue's response verbatim for the ledger's venue reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub quantity: Decimal,
    pub venue_order_id: String,
    pub raw: serde_json::Value,
}

/// A single order attempt and its outcome, as returned to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub status: OrderStatus,
    /// Present only once the order is `Filled`.
    pub fill_price: Option<Decimal>,
    /// Present only once the order is `Rejected` or `Failed`.
    pub reason: Option<String>,
    pub requested_at: i64,
}

impl Order {
    pub fn pending(validated: &ValidatedOrder) -> Self {
        Self {
            id: validated.id.clone(),
            symbol: validated.symbol.clone(),
            side: validated.side,
            quantity: validated.quantity,
            status: OrderStatus::Pending,
            fill_price: None,
            reason: None,
            requested_at: validated.requested_at,
        }
    }

    /// Transition `Pending -> Filled`. Consumes the order so a terminal
    /// order cannot be transitioned again.
    pub fn into_filled(mut self, fill: &Fill) -> Self {
        debug_assert_eq!(self.status, OrderStatus::Pending);
        self.status = OrderStatus::Filled;
        self.fill_price = Some(fill.price);
        self
    }

    /// Transition `Pending -> Rejected` with the venue's reason.
    pub fn into_rejected(mut self, reason: impl Into<String>) -> Self {
        debug_assert_eq!(self.status, OrderStatus::Pending);
        self.status = OrderStatus::Rejected;
        self.reason = Some(reason.into());
        self
    }

    /// Transition `Pending -> Failed` for an attempt the venue definitively
    /// did not execute.
    pub fn into_failed(mut self, reason: impl Into<String>) -> Self {
        debug_assert_eq!(self.status, OrderStatus::Pending);
        self.status = OrderStatus::Failed;
        self.reason = Some(reason.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// An order as the venue reports it, used by the startup reconciliation
/// pass to close ledger gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueOrder {
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub status: OrderStatus,
    pub price: Option<Decimal>,
    pub timestamp: i64,
}

impl VenueOrder {
    /// Rebuild the order this venue record corresponds to, for appending a
    /// recovered ledger entry.
    pub fn to_order(&self) -> Order {
        Order {
            id: self.client_order_id.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            quantity: self.quantity,
            status: self.status,
            fill_price: if self.status == OrderStatus::Filled {
                self.price
            } else {
                None
            },
            reason: match self.status {
                OrderStatus::Rejected | OrderStatus::Failed => {
                    Some("recovered from venue order history".to_string())
                }
                _ => None,
            },
            requested_at: self.timestamp,
        }
    }
}

/// Opaque strategy status blob passed through to the dashboard unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyState(pub serde_json::Value);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_parsing() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("sell".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert_eq!(" Buy ".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert!("HOLD".parse::<OrderSide>().is_err());
        assert!("".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Filled,
            OrderStatus::Rejected,
            OrderStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_pending_to_filled_transition() {
        let validated = ValidatedOrder::new("BTCUSDT", OrderSide::Buy, dec!(0.01));
        let order = Order::pending(&validated);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.fill_price.is_none());

        let fill = Fill {
            price: dec!(96000),
            quantity: dec!(0.01),
            venue_order_id: "12345".to_string(),
            raw: serde_json::json!({"status": "FILLED"}),
        };
        let order = order.into_filled(&fill);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.fill_price, Some(dec!(96000)));
        assert!(order.reason.is_none());
    }

    #[test]
    fn test_pending_to_rejected_carries_reason() {
        let validated = ValidatedOrder::new("ETHUSDT", OrderSide::Sell, dec!(0.1));
        let order = Order::pending(&validated).into_rejected("insufficient balance");
        assert_eq!(order.status, OrderStatus::Rejected);
        assert_eq!(order.reason.as_deref(), Some("insufficient balance"));
        assert!(order.fill_price.is_none());
    }

    #[test]
    fn test_client_order_ids_are_unique() {
        let a = ValidatedOrder::new("BTCUSDT", OrderSide::Buy, dec!(1));
        let b = ValidatedOrder::new("BTCUSDT", OrderSide::Buy, dec!(1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_order_request_wire_format() {
        // The dashboard posts camelCase payloads.
        let json = r#"{"orderType":"BUY","symbol":"BTCUSDT","quantity":"0.01"}"#;
        let request: OrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.order_type, "BUY");
        assert_eq!(request.symbol, "BTCUSDT");
        assert_eq!(request.quantity, dec!(0.01));

        let back = serde_json::to_value(&request).unwrap();
        assert!(back.get("orderType").is_some());
    }

    #[test]
    fn test_venue_order_to_order_filled() {
        let vo = VenueOrder {
            client_order_id: "abc".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            quantity: dec!(0.5),
            status: OrderStatus::Filled,
            price: Some(dec!(90000)),
            timestamp: 1_700_000_000_000,
        };
        let order = vo.to_order();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.fill_price, Some(dec!(90000)));
        assert!(order.reason.is_none());
    }

    #[test]
    fn test_venue_order_to_order_rejected() {
        let vo = VenueOrder {
            client_order_id: "def".to_string(),
            symbol: "ETHUSDT".to_string(),
            side: OrderSide::Sell,
            quantity: dec!(1),
            status: OrderStatus::Rejected,
            price: None,
            timestamp: 1_700_000_000_000,
        };
        let order = vo.to_order();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(order.fill_price.is_none());
        assert!(order.reason.is_some());
    }
}

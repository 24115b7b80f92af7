//! Binance Spot Gateway
//!
//! Submits validated orders to Binance spot and reads order history back
//! for reconciliation:
//! - MARKET order placement keyed by `newClientOrderId`
//! - HMAC-SHA256 request signing
//! - Venue error classification into the gateway failure classes

use crate::domain::errors::GatewayError;
use crate::domain::ports::{ExchangeGateway, VenueCredentials};
use crate::domain::trading::types::{Fill, OrderSide, OrderStatus, ValidatedOrder, VenueOrder};
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// How many rows to pull per symbol from `GET /api/v3/allOrders` when
/// reconciling. The venue caps the endpoint at 1000.
const ORDER_HISTORY_LIMIT: u32 = 200;

/// Venue error codes that mean the key or signature is bad, not the order:
/// -1022 invalid signature, -2014 bad API key format, -2015 rejected key.
const AUTH_ERROR_CODES: [i64; 3] = [-1022, -2014, -2015];

pub struct BinanceGateway {
    client: ClientWithMiddleware,
    credentials: RwLock<VenueCredentials>,
    base_url: String,
    recv_window_ms: u64,
    submit_timeout: Duration,
}

impl BinanceGateway {
    pub fn new(
        credentials: VenueCredentials,
        base_url: String,
        recv_window_ms: u64,
        submit_timeout: Duration,
    ) -> Self {
        let client = HttpClientFactory::create_client(submit_timeout);

        Self {
            client,
            credentials: RwLock::new(credentials),
            base_url,
            recv_window_ms,
            submit_timeout,
        }
    }

    /// Sign `query` with the current secret and return the API key to send
    /// alongside it. Reads the credentials under the lock once so a refresh
    /// cannot split key and signature across generations.
    async fn signed_query(&self, query: &str) -> (String, String) {
        let credentials = self.credentials.read().await;
        let signature = sign_query(&credentials.secret_key, query);
        let signed = format!("{}&signature={}", query, signature);
        (credentials.api_key.clone(), signed)
    }

    async fn submit_inner(&self, order: &ValidatedOrder) -> Result<Fill, GatewayError> {
        let timestamp = chrono::Utc::now().timestamp_millis();

        let params = [
            ("symbol", order.symbol.clone()),
            ("side", order.side.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", order.quantity.to_string()),
            ("newClientOrderId", order.id.clone()),
            ("newOrderRespType", "FULL".to_string()),
            ("recvWindow", self.recv_window_ms.to_string()),
            ("timestamp", timestamp.to_string()),
        ];

        let query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let (api_key, signed_query) = self.signed_query(&query).await;
        let url = format!("{}/api/v3/order?{}", self.base_url, signed_query);

        debug!(
            "BinanceGateway: submitting {} {} {} as {}",
            order.side, order.quantity, order.symbol, order.id
        );

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &api_key)
            .send()
            .await
            .map_err(|e| GatewayError::NetworkTimeout {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }

        let raw: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| GatewayError::NetworkTimeout {
                    reason: format!("unintelligible venue response: {}", e),
                })?;

        fill_from_response(raw)
    }
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn submit(&self, order: &ValidatedOrder) -> Result<Fill, GatewayError> {
        // Hard deadline over the whole call, transient retries included.
        match tokio::time::timeout(self.submit_timeout, self.submit_inner(order)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::NetworkTimeout {
                reason: format!(
                    "no venue response within {}ms",
                    self.submit_timeout.as_millis()
                ),
            }),
        }
    }

    async fn recent_orders(&self, symbol: &str) -> Result<Vec<VenueOrder>, GatewayError> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let query = format!(
            "symbol={}&limit={}&recvWindow={}&timestamp={}",
            symbol, ORDER_HISTORY_LIMIT, self.recv_window_ms, timestamp
        );

        let (api_key, signed_query) = self.signed_query(&query).await;
        let url = format!("{}/api/v3/allOrders?{}", self.base_url, signed_query);

        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &api_key)
            .send()
            .await
            .map_err(|e| GatewayError::NetworkTimeout {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }

        let rows: Vec<VenueOrderRow> =
            response
                .json()
                .await
                .map_err(|e| GatewayError::NetworkTimeout {
                    reason: format!("unintelligible venue response: {}", e),
                })?;

        Ok(rows.into_iter().filter_map(venue_order_from_row).collect())
    }

    async fn refresh_credentials(
        &self,
        credentials: VenueCredentials,
    ) -> Result<(), GatewayError> {
        let mut guard = self.credentials.write().await;
        *guard = credentials;
        info!("BinanceGateway: credentials replaced");
        Ok(())
    }
}

/// Generate the HMAC-SHA256 signature Binance expects over the query string.
fn sign_query(secret: &str, query: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Deserialize)]
struct VenueErrorBody {
    code: i64,
    msg: String,
}

/// Sort a non-2xx venue answer into the three gateway failure classes.
fn classify_http_failure(status: StatusCode, body: &str) -> GatewayError {
    let (code, msg) = match serde_json::from_str::<VenueErrorBody>(body) {
        Ok(err) => (err.code, err.msg),
        Err(_) => (
            i64::from(status.as_u16()),
            if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body.to_string()
            },
        ),
    };

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || AUTH_ERROR_CODES.contains(&code)
    {
        return GatewayError::AuthFailure { reason: msg };
    }

    // 429 is rate-limit pushback, 418 the venue's auto-ban variant of it,
    // 5xx venue trouble. All transient; safe to resubmit under the same
    // client order id.
    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 || status.is_server_error()
    {
        return GatewayError::NetworkTimeout {
            reason: format!("HTTP {}: {}", status.as_u16(), msg),
        };
    }

    GatewayError::VenueRejected { code, reason: msg }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    status: String,
    executed_qty: String,
    // Binance spells it "cummulativeQuoteQty" on the wire.
    cummulative_quote_qty: String,
}

/// Fold a 2xx order response into one `Fill`. `cummulativeQuoteQty` over
/// `executedQty` is the volume-weighted price across partial executions, so
/// the order state machine never sees partial fills.
fn fill_from_response(raw: serde_json::Value) -> Result<Fill, GatewayError> {
    // A 2xx body we cannot read leaves the outcome unknown, same as a
    // timeout; reconciliation picks the order up from venue history.
    fn unintelligible(detail: impl std::fmt::Display) -> GatewayError {
        GatewayError::NetworkTimeout {
            reason: format!("unintelligible venue response: {}", detail),
        }
    }

    let response: OrderResponse =
        serde_json::from_value(raw.clone()).map_err(|e| unintelligible(e))?;

    let executed_qty =
        Decimal::from_str(&response.executed_qty).map_err(|e| unintelligible(e))?;
    let quote_qty =
        Decimal::from_str(&response.cummulative_quote_qty).map_err(|e| unintelligible(e))?;

    if executed_qty.is_zero() {
        return Err(GatewayError::VenueRejected {
            code: 0,
            reason: format!(
                "order {} ended {} with nothing executed",
                response.order_id, response.status
            ),
        });
    }

    Ok(Fill {
        price: quote_qty / executed_qty,
        quantity: executed_qty,
        venue_order_id: response.order_id.to_string(),
        raw,
    })
}

/// Map a venue lifecycle status onto the order state machine. Anything
/// still working at the venue stays `Pending` and is skipped by
/// reconciliation until it settles.
fn map_venue_status(venue_status: &str) -> OrderStatus {
    match venue_status {
        "FILLED" => OrderStatus::Filled,
        "REJECTED" => OrderStatus::Rejected,
        "CANCELED" | "EXPIRED" => OrderStatus::Failed,
        _ => OrderStatus::Pending,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VenueOrderRow {
    symbol: String,
    client_order_id: String,
    side: String,
    status: String,
    orig_qty: String,
    executed_qty: String,
    cummulative_quote_qty: String,
    time: i64,
}

fn venue_order_from_row(row: VenueOrderRow) -> Option<VenueOrder> {
    let side = row.side.parse::<OrderSide>().ok()?;
    let orig_qty = Decimal::from_str(&row.orig_qty).ok()?;
    let executed_qty = Decimal::from_str(&row.executed_qty).ok()?;
    let quote_qty = Decimal::from_str(&row.cummulative_quote_qty).ok()?;

    let quantity = if executed_qty > Decimal::ZERO {
        executed_qty
    } else {
        orig_qty
    };

    Some(VenueOrder {
        client_order_id: row.client_order_id,
        symbol: row.symbol,
        side,
        quantity,
        status: map_venue_status(&row.status),
        price: (executed_qty > Decimal::ZERO).then(|| quote_qty / executed_qty),
        timestamp: row.time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_sign_query_matches_venue_docs() {
        // Worked example from the Binance signed-endpoint documentation.
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            sign_query(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_classify_auth_failure_by_status() {
        let err = classify_http_failure(
            StatusCode::UNAUTHORIZED,
            r#"{"code":-2014,"msg":"API-key format invalid."}"#,
        );
        assert!(matches!(err, GatewayError::AuthFailure { .. }));
    }

    #[test]
    fn test_classify_auth_failure_by_code() {
        // Bad signature comes back as a 400, not a 401.
        let err = classify_http_failure(
            StatusCode::BAD_REQUEST,
            r#"{"code":-1022,"msg":"Signature for this request is not valid."}"#,
        );
        assert!(matches!(err, GatewayError::AuthFailure { .. }));
    }

    #[test]
    fn test_classify_rate_limit_as_transient() {
        let err = classify_http_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"code":-1003,"msg":"Too many requests."}"#,
        );
        assert!(matches!(err, GatewayError::NetworkTimeout { .. }));

        let err = classify_http_failure(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(err, GatewayError::NetworkTimeout { .. }));
    }

    #[test]
    fn test_classify_business_rejection() {
        let err = classify_http_failure(
            StatusCode::BAD_REQUEST,
            r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#,
        );
        match err {
            GatewayError::VenueRejected { code, reason } => {
                assert_eq!(code, -2010);
                assert!(reason.contains("insufficient balance"));
            }
            other => panic!("expected VenueRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_non_json_body_falls_back_to_status() {
        let err = classify_http_failure(StatusCode::BAD_REQUEST, "");
        match err {
            GatewayError::VenueRejected { code, reason } => {
                assert_eq!(code, 400);
                assert_eq!(reason, "HTTP 400 Bad Request");
            }
            other => panic!("expected VenueRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_fill_is_volume_weighted_over_partial_executions() {
        let raw = json!({
            "orderId": 28,
            "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
            "status": "FILLED",
            "origQty": "0.002",
            "executedQty": "0.002",
            "cummulativeQuoteQty": "192.00",
            "fills": [
                {"price": "96100.00", "qty": "0.001"},
                {"price": "95900.00", "qty": "0.001"}
            ]
        });

        let fill = fill_from_response(raw).unwrap();
        assert_eq!(fill.price, dec!(96000));
        assert_eq!(fill.quantity, dec!(0.002));
        assert_eq!(fill.venue_order_id, "28");
    }

    #[test]
    fn test_fill_with_nothing_executed_is_rejection() {
        let raw = json!({
            "orderId": 29,
            "status": "EXPIRED",
            "executedQty": "0.00000000",
            "cummulativeQuoteQty": "0.00000000"
        });

        assert!(matches!(
            fill_from_response(raw),
            Err(GatewayError::VenueRejected { .. })
        ));
    }

    #[test]
    fn test_unreadable_fill_is_transient_not_rejection() {
        let err = fill_from_response(json!({"unexpected": "shape"})).unwrap_err();
        match err {
            GatewayError::NetworkTimeout { reason } => {
                assert!(reason.contains("unintelligible"));
            }
            other => panic!("expected NetworkTimeout, got {:?}", other),
        }
    }

    #[test]
    fn test_map_venue_status() {
        assert_eq!(map_venue_status("FILLED"), OrderStatus::Filled);
        assert_eq!(map_venue_status("REJECTED"), OrderStatus::Rejected);
        assert_eq!(map_venue_status("CANCELED"), OrderStatus::Failed);
        assert_eq!(map_venue_status("EXPIRED"), OrderStatus::Failed);
        assert_eq!(map_venue_status("NEW"), OrderStatus::Pending);
        assert_eq!(map_venue_status("PARTIALLY_FILLED"), OrderStatus::Pending);
    }

    #[test]
    fn test_venue_order_row_mapping() {
        let row = VenueOrderRow {
            symbol: "BTCUSDT".to_string(),
            client_order_id: "abc-123".to_string(),
            side: "SELL".to_string(),
            status: "FILLED".to_string(),
            orig_qty: "0.01".to_string(),
            executed_qty: "0.01".to_string(),
            cummulative_quote_qty: "960.00".to_string(),
            time: 1_700_000_000_000,
        };

        let order = venue_order_from_row(row).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.quantity, dec!(0.01));
        assert_eq!(order.price, Some(dec!(96000)));
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_open_venue_order_keeps_original_quantity() {
        let row = VenueOrderRow {
            symbol: "ETHUSDT".to_string(),
            client_order_id: "def-456".to_string(),
            side: "BUY".to_string(),
            status: "NEW".to_string(),
            orig_qty: "0.5".to_string(),
            executed_qty: "0.00000000".to_string(),
            cummulative_quote_qty: "0.00000000".to_string(),
            time: 1_700_000_000_000,
        };

        let order = venue_order_from_row(row).unwrap();
        assert_eq!(order.quantity, dec!(0.5));
        assert_eq!(order.price, None);
        assert_eq!(order.status, OrderStatus::Pending);
    }
}

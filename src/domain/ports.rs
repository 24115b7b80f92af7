use async_trait::async_trait;

use crate::domain::errors::GatewayError;
use crate::domain::trading::types::{Fill, StrategyState, ValidatedOrder, VenueOrder};

/// Venue API credentials, loaded once at startup and replaced wholesale on
/// refresh.
#[derive(Debug, Clone)]
pub struct VenueCredentials {
    pub api_key: String,
    pub secret_key: String,
}

// Need async_trait for async functions in traits
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Submit a validated order to the venue.
    ///
    /// The order's id travels as the client order id, so a retried
    /// submission after a timeout cannot fill twice. At most one fill ever
    /// results per call.
    async fn submit(&self, order: &ValidatedOrder) -> Result<Fill, GatewayError>;

    /// The venue's recent order history for one symbol, oldest first.
    /// Reconciliation compares this against the ledger.
    async fn recent_orders(&self, symbol: &str) -> Result<Vec<VenueOrder>, GatewayError>;

    /// Swap in fresh credentials after an [`GatewayError::AuthFailure`].
    async fn refresh_credentials(&self, credentials: VenueCredentials) -> Result<(), GatewayError>;
}

/// Source of the opaque strategy status blob the dashboard renders.
#[async_trait]
pub trait StrategyStateSource: Send + Sync {
    async fn current(&self) -> StrategyState;
}

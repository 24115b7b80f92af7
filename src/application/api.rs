use async_trait::async_trait;

use crate::domain::errors::TradingError;
use crate::domain::performance::snapshot::PerformanceSnapshot;
use crate::domain::trading::types::{Order, OrderRequest, StrategyState};

/// The dashboard's RPC surface, one method per remote procedure.
///
/// The transport layer marshals JSON into these calls and back out; it
/// holds no trading logic of its own.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Validate, submit and record one order. Never returns a `Pending`
    /// order: the result is terminal or a typed error.
    async fn place_order(&self, request: OrderRequest) -> Result<Order, TradingError>;

    /// Performance metrics recomputed from the full ledger.
    async fn get_performance(&self) -> Result<PerformanceSnapshot, TradingError>;

    /// Opaque strategy status blob for the dashboard's status widget.
    async fn get_strategy_state(&self) -> Result<StrategyState, TradingError>;
}

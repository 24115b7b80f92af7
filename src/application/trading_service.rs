use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::application::api::DashboardApi;
use crate::domain::errors::{GatewayError, LedgerError, TradingError};
use crate::domain::ledger::{NewLedgerEntry, OrderLedger};
use crate::domain::performance::aggregator::PnlFold;
use crate::domain::performance::snapshot::PerformanceSnapshot;
use crate::domain::ports::{ExchangeGateway, StrategyStateSource, VenueCredentials};
use crate::domain::trading::rules::TradingRules;
use crate::domain::trading::types::{Order, OrderRequest, StrategyState};
use crate::infrastructure::observability::Metrics;

/// Result of a startup reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Venue history records inspected.
    pub venue_orders_seen: u64,
    /// Entries recovered for orders the venue executed but the ledger
    /// never saw.
    pub entries_recovered: u64,
}

/// The trading facade: validates, submits and records orders, and answers
/// the dashboard's performance and status queries.
///
/// One instance serves all concurrent RPC calls. The only mutable state
/// here is the halt latch; history lives in the ledger, positions are
/// derived from it on demand.
pub struct TradingService {
    rules: TradingRules,
    gateway: Arc<dyn ExchangeGateway>,
    ledger: Arc<dyn OrderLedger>,
    strategy: Arc<dyn StrategyStateSource>,
    metrics: Metrics,
    venue: String,
    halted: AtomicBool,
}

impl TradingService {
    pub fn new(
        rules: TradingRules,
        gateway: Arc<dyn ExchangeGateway>,
        ledger: Arc<dyn OrderLedger>,
        strategy: Arc<dyn StrategyStateSource>,
        metrics: Metrics,
        venue: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            gateway,
            ledger,
            strategy,
            metrics,
            venue: venue.into(),
            halted: AtomicBool::new(false),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        self.metrics.set_halted(true);
    }

    /// Install fresh venue credentials and release the halt latch.
    pub async fn refresh_credentials(
        &self,
        credentials: VenueCredentials,
    ) -> Result<(), TradingError> {
        self.gateway.refresh_credentials(credentials).await?;
        self.halted.store(false, Ordering::SeqCst);
        self.metrics.set_halted(false);
        info!("TradingService: Credentials refreshed, trading resumed");
        Ok(())
    }

    /// Compare venue order history against the ledger and append entries
    /// for terminal orders the ledger is missing.
    ///
    /// Gaps appear when a submission times out mid-flight or a fill's
    /// append fails. Running this again is harmless: recovered entries are
    /// found on the next pass and skipped.
    pub async fn reconcile(&self) -> Result<ReconcileReport, TradingError> {
        let mut report = ReconcileReport::default();

        for symbol in self.rules.symbols() {
            let venue_orders = match self.gateway.recent_orders(&symbol).await {
                Ok(orders) => orders,
                Err(GatewayError::AuthFailure { reason }) => {
                    self.halt();
                    error!(
                        "TradingService: Credential failure during reconciliation: {}",
                        reason
                    );
                    return Err(GatewayError::AuthFailure { reason }.into());
                }
                Err(err) => return Err(err.into()),
            };

            for venue_order in venue_orders {
                report.venue_orders_seen += 1;
                if !venue_order.status.is_terminal() {
                    continue;
                }
                if self.ledger.contains_order(&venue_order.client_order_id).await? {
                    continue;
                }

                let order = venue_order.to_order();
                let venue_ref = serde_json::to_value(&venue_order).ok();
                match self.ledger.append(NewLedgerEntry::reconciled(order, venue_ref)).await {
                    Ok(sequence) => {
                        report.entries_recovered += 1;
                        warn!(
                            "TradingService: Recovered order {} for {} from venue history (seq {})",
                            venue_order.client_order_id, venue_order.symbol, sequence
                        );
                    }
                    // Lost an append race; the entry exists, which is all
                    // reconciliation needs.
                    Err(LedgerError::DuplicateOrder { .. }) => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }

        if report.entries_recovered > 0 {
            warn!(
                "TradingService: Reconciliation recovered {} of {} venue orders",
                report.entries_recovered, report.venue_orders_seen
            );
        } else {
            info!(
                "TradingService: Reconciliation clean ({} venue orders checked)",
                report.venue_orders_seen
            );
        }
        Ok(report)
    }

    async fn compute_snapshot(&self) -> Result<PerformanceSnapshot, TradingError> {
        let mut stream = self.ledger.stream_all().await?;
        let mut fold = PnlFold::new();
        while let Some(entry) = stream.next().await {
            fold.absorb(&entry?);
        }
        Ok(fold.snapshot())
    }
}

#[async_trait]
impl DashboardApi for TradingService {
    async fn place_order(&self, request: OrderRequest) -> Result<Order, TradingError> {
        if self.is_halted() {
            debug!("TradingService: Rejecting order while halted");
            return Err(TradingError::Halted);
        }

        let validated = self.rules.validate(&request)?;
        let side_label = validated.side.to_string().to_lowercase();
        let order = Order::pending(&validated);

        debug!(
            "TradingService: Submitting {} {} {} (order {})",
            validated.side, validated.quantity, validated.symbol, validated.id
        );

        let started = Instant::now();
        let submitted = self.gateway.submit(&validated).await;
        self.metrics
            .observe_api_latency(&self.venue, "order", started.elapsed().as_secs_f64());

        match submitted {
            Ok(fill) => {
                let order = order.into_filled(&fill);
                let entry = NewLedgerEntry::live(order.clone(), Some(fill.raw.clone()));
                match self.ledger.append(entry).await {
                    Ok(sequence) => {
                        info!(
                            "TradingService: Order {} filled @ {} (seq {})",
                            order.id, fill.price, sequence
                        );
                        self.metrics.inc_orders(&side_label, "filled");
                        Ok(order)
                    }
                    Err(err) => {
                        // The fill is real money; without its entry the
                        // books are wrong until reconciliation closes the
                        // gap. The caller must see this as neither success
                        // nor rejection.
                        error!(
                            "TradingService: Order {} filled but ledger append failed: {}",
                            order.id, err
                        );
                        self.metrics.inc_orders(&side_label, "unrecorded");
                        Err(TradingError::OutcomeUnknown {
                            order_id: order.id,
                            source: err,
                        })
                    }
                }
            }
            Err(GatewayError::VenueRejected { code, reason }) => {
                warn!(
                    "TradingService: Venue rejected order {} (code {}): {}",
                    order.id, code, reason
                );
                let order = order.into_rejected(reason.as_str());
                let venue_ref = json!({ "code": code, "msg": reason });
                self.ledger
                    .append(NewLedgerEntry::live(order.clone(), Some(venue_ref)))
                    .await?;
                self.metrics.inc_orders(&side_label, "rejected");
                Ok(order)
            }
            Err(err @ GatewayError::NetworkTimeout { .. }) => {
                // No ledger entry: the venue may or may not have executed
                // this order. Reconciliation closes the gap from venue
                // history on the next startup.
                warn!(
                    "TradingService: Order {} timed out at the venue: {}",
                    order.id, err
                );
                self.metrics.inc_orders(&side_label, "timeout");
                Err(err.into())
            }
            Err(GatewayError::AuthFailure { reason }) => {
                self.halt();
                error!(
                    "TradingService: Credential failure, halting submissions: {}",
                    reason
                );
                let order = order.into_failed(format!("authentication failure: {reason}"));
                if let Err(append_err) = self
                    .ledger
                    .append(NewLedgerEntry::live(order, None))
                    .await
                {
                    error!(
                        "TradingService: Failed to record auth-failed attempt: {}",
                        append_err
                    );
                }
                self.metrics.inc_orders(&side_label, "failed");
                Err(GatewayError::AuthFailure { reason }.into())
            }
        }
    }

    async fn get_performance(&self) -> Result<PerformanceSnapshot, TradingError> {
        let snapshot = self.compute_snapshot().await?;
        self.metrics.update_performance(&snapshot);
        Ok(snapshot)
    }

    async fn get_strategy_state(&self) -> Result<StrategyState, TradingError> {
        Ok(self.strategy.current().await)
    }
}

//! Push-based metrics reporter for tradedesk
//!
//! Periodically recomputes the performance snapshot and outputs it as
//! structured JSON to stdout.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::application::api::DashboardApi;
use crate::application::trading_service::TradingService;
use crate::infrastructure::observability::metrics::Metrics;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub performance: PerformanceReport,
    pub system: SystemSnapshot,
}

#[derive(Serialize)]
pub struct PerformanceReport {
    pub realized_pnl_usd: f64,
    pub win_rate: Option<f64>,
    pub trades: u64,
    pub closed_trades: u64,
    pub ledger_entries: u64,
    pub exposure: Vec<ExposureEntry>,
}

#[derive(Serialize)]
pub struct ExposureEntry {
    pub symbol: String,
    pub net_quantity: f64,
}

#[derive(Serialize)]
pub struct SystemSnapshot {
    pub trading_halted: bool,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
/// No HTTP server, no incoming connections - only outbound data.
pub struct SnapshotReporter {
    service: Arc<TradingService>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl SnapshotReporter {
    pub fn new(service: Arc<TradingService>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            service,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "SnapshotReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );
        info!("SnapshotReporter: Metrics will be output as JSON to stdout");

        loop {
            tokio::time::sleep(self.interval).await;

            match self.collect_snapshot().await {
                Ok(snapshot) => {
                    // Special prefix so the lines can be filtered out of logs
                    match serde_json::to_string(&snapshot) {
                        Ok(json) => {
                            println!("METRICS_JSON:{}", json);
                            info!(
                                "Performance: ${:.2} realized | {} trades | Uptime: {}s",
                                snapshot.performance.realized_pnl_usd,
                                snapshot.performance.trades,
                                snapshot.uptime_seconds
                            );
                        }
                        Err(e) => warn!("Failed to serialize metrics: {}", e),
                    }
                }
                Err(e) => warn!("Failed to collect metrics: {}", e),
            }
        }
    }

    /// Collect current metrics snapshot
    ///
    /// `get_performance` refreshes the prometheus gauges as a side effect,
    /// so only uptime needs setting here.
    async fn collect_snapshot(&self) -> anyhow::Result<MetricsSnapshot> {
        let performance = self.service.get_performance().await?;
        let uptime = self.start_time.elapsed().as_secs();

        self.metrics.uptime_seconds.set(uptime as f64);

        let exposure: Vec<ExposureEntry> = performance
            .exposure
            .iter()
            .map(|(symbol, net)| ExposureEntry {
                symbol: symbol.clone(),
                net_quantity: net.to_f64().unwrap_or(0.0),
            })
            .collect();

        Ok(MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            performance: PerformanceReport {
                realized_pnl_usd: performance.realized_pnl.to_f64().unwrap_or(0.0),
                win_rate: performance.win_rate.and_then(|rate| rate.to_f64()),
                trades: performance.trades,
                closed_trades: performance.closed_trades,
                ledger_entries: performance.ledger_entries,
                exposure,
            },
            system: SystemSnapshot {
                trading_halted: self.service.is_halted(),
            },
        })
    }
}

//! Prometheus metrics definitions for tradedesk
//!
//! All metrics use the `tradedesk_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

use crate::domain::performance::snapshot::PerformanceSnapshot;

/// Prometheus metrics for the trading backend
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Total orders counter by side and status
    pub orders_total: CounterVec,
    /// Realized P&L in USD, from the latest performance snapshot
    pub realized_pnl_usd: GenericGauge<AtomicF64>,
    /// Current win rate (0-1)
    pub win_rate_current: GenericGauge<AtomicF64>,
    /// Net open exposure per symbol, signed
    pub open_exposure: GenericGaugeVec<AtomicF64>,
    /// Number of ledger entries
    pub ledger_entries: GenericGauge<AtomicF64>,
    /// Whether submissions are halted (0=trading, 1=halted)
    pub trading_halted: GenericGauge<AtomicF64>,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
    /// Venue request latency in seconds
    pub api_latency_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_total = CounterVec::new(
            Opts::new("tradedesk_orders_total", "Total orders by side and status"),
            &["side", "status"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let realized_pnl_usd = Gauge::with_opts(Opts::new(
            "tradedesk_realized_pnl_usd",
            "Realized P&L in USD",
        ))?;
        registry.register(Box::new(realized_pnl_usd.clone()))?;

        let win_rate_current = Gauge::with_opts(Opts::new(
            "tradedesk_win_rate_current",
            "Current win rate (0-1)",
        ))?;
        registry.register(Box::new(win_rate_current.clone()))?;

        let open_exposure = GaugeVec::new(
            Opts::new(
                "tradedesk_open_exposure",
                "Net open exposure per symbol, signed quantity",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(open_exposure.clone()))?;

        let ledger_entries = Gauge::with_opts(Opts::new(
            "tradedesk_ledger_entries",
            "Number of ledger entries",
        ))?;
        registry.register(Box::new(ledger_entries.clone()))?;

        let trading_halted = Gauge::with_opts(Opts::new(
            "tradedesk_trading_halted",
            "Whether submissions are halted (0=trading, 1=halted)",
        ))?;
        registry.register(Box::new(trading_halted.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "tradedesk_uptime_seconds",
            "Server uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let api_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tradedesk_api_latency_seconds",
                "Venue request latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["venue", "endpoint"],
        )?;
        registry.register(Box::new(api_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            orders_total,
            realized_pnl_usd,
            win_rate_current,
            open_exposure,
            ledger_entries,
            trading_halted,
            uptime_seconds,
            api_latency_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Increment order counter
    pub fn inc_orders(&self, side: &str, status: &str) {
        self.orders_total.with_label_values(&[side, status]).inc();
    }

    /// Observe venue request latency
    pub fn observe_api_latency(&self, venue: &str, endpoint: &str, latency: f64) {
        self.api_latency_seconds
            .with_label_values(&[venue, endpoint])
            .observe(latency);
    }

    /// Flip the halt flag
    pub fn set_halted(&self, halted: bool) {
        self.trading_halted.set(if halted { 1.0 } else { 0.0 });
    }

    /// Push a performance snapshot into the gauges
    pub fn update_performance(&self, snapshot: &PerformanceSnapshot) {
        self.realized_pnl_usd
            .set(snapshot.realized_pnl.to_f64().unwrap_or(0.0));
        self.win_rate_current.set(
            snapshot
                .win_rate
                .and_then(|rate| rate.to_f64())
                .unwrap_or(0.0),
        );
        self.ledger_entries.set(snapshot.ledger_entries as f64);

        // Reset first so symbols that netted back to zero drop out.
        self.open_exposure.reset();
        for (symbol, net) in &snapshot.exposure {
            self.open_exposure
                .with_label_values(&[symbol.as_str()])
                .set(net.to_f64().unwrap_or(0.0));
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}

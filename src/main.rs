//! tradedesk server - headless trading-dashboard backend
//!
//! Runs the execution core without a UI: orders come in through the
//! `DashboardApi` facade, metrics go out as structured JSON logs to stdout.
//!
//! # Environment Variables
//! - `MODE` - `paper` or `binance` (default: paper)
//! - `TRADING_PAIRS` - Comma-separated recognized pairs (default: BTCUSDT,ETHUSDT)
//! - `DATABASE_URL` - Ledger location (default: sqlite://data/tradedesk.db)
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use std::sync::Arc;
use tradedesk::application::trading_service::TradingService;
use tradedesk::config::Config;
use tradedesk::domain::trading::rules::TradingRules;
use tradedesk::infrastructure::ServiceFactory;
use tradedesk::infrastructure::observability::{Metrics, SnapshotReporter};
use tradedesk::infrastructure::persistence::{Database, SqliteLedger};
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Setup logging (stdout only)
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("tradedesk Server {} starting...", env!("CARGO_PKG_VERSION"));
    info!("Metrics: Push-based (JSON to stdout)");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Mode={:?}, Pairs={:?}",
        config.mode, config.trading_pairs
    );

    // Open the ledger
    let database = Database::connect(&config.database_url).await?;
    let ledger = Arc::new(SqliteLedger::new(database.pool.clone()));

    // Build mode-appropriate services
    let metrics = Metrics::new()?;
    let gateway = ServiceFactory::create_gateway(&config);
    let strategy = ServiceFactory::create_strategy_source(&config);

    let service = Arc::new(TradingService::new(
        TradingRules::for_symbols(&config.trading_pairs),
        gateway,
        ledger,
        strategy,
        metrics.clone(),
        config.mode.as_str(),
    ));

    // Close any ledger gaps a previous run left behind before serving.
    match service.reconcile().await {
        Ok(report) => info!(
            "Reconciliation complete: {} venue orders seen, {} entries recovered",
            report.venue_orders_seen, report.entries_recovered
        ),
        Err(e) => warn!(
            "Reconciliation failed, continuing with the ledger as-is: {}",
            e
        ),
    }

    // Start metrics reporter if enabled
    if config.observability_enabled {
        let reporter = SnapshotReporter::new(
            service.clone(),
            metrics.clone(),
            config.observability_interval_seconds,
        );

        tokio::spawn(async move {
            reporter.run().await;
        });

        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability_interval_seconds
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    info!("Server running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");

    Ok(())
}

use crate::config::{Config, Mode};
use crate::domain::ports::{ExchangeGateway, StrategyStateSource};
use crate::infrastructure::binance::BinanceGateway;
use crate::infrastructure::paper::PaperGateway;
use crate::infrastructure::strategy_state::StaticStrategyState;
use std::sync::Arc;
use std::time::Duration;

pub struct ServiceFactory;

impl ServiceFactory {
    /// Build the exchange gateway matching the configured mode.
    pub fn create_gateway(config: &Config) -> Arc<dyn ExchangeGateway> {
        match config.mode {
            Mode::Paper => Arc::new(PaperGateway::new()),
            Mode::Binance => Arc::new(BinanceGateway::new(
                config.venue_credentials(),
                config.binance_base_url.clone(),
                config.recv_window_ms,
                Duration::from_millis(config.submit_timeout_ms),
            )),
        }
    }

    pub fn create_strategy_source(config: &Config) -> Arc<dyn StrategyStateSource> {
        Arc::new(StaticStrategyState::new(
            config.mode.as_str(),
            &config.trading_pairs,
        ))
    }
}

//! Venue configuration parsing from environment variables.

use std::env;

/// Binance API configuration
#[derive(Debug, Clone, Default)]
pub struct BinanceEnvConfig {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub recv_window_ms: u64,
}

impl BinanceEnvConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("BINANCE_API_KEY").unwrap_or_default(),
            secret_key: env::var("BINANCE_SECRET_KEY").unwrap_or_default(),
            base_url: env::var("BINANCE_BASE_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            recv_window_ms: env::var("BINANCE_RECV_WINDOW_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u64>()
                .unwrap_or(5000),
        }
    }
}

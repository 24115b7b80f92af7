//! Configuration module for tradedesk.
//!
//! This module provides structured configuration loading from environment
//! variables, organized by domain: execution mode, trading universe,
//! persistence, venue access, and observability.

mod observability_config;
mod venue_config;

pub use observability_config::ObservabilityEnvConfig;
pub use venue_config::BinanceEnvConfig;

use crate::domain::ports::VenueCredentials;
use anyhow::Result;
use std::env;
use std::str::FromStr;

/// Application execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Paper,
    Binance,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Paper => "paper",
            Mode::Binance => "binance",
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paper" => Ok(Mode::Paper),
            "binance" => Ok(Mode::Binance),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'paper' or 'binance'", s),
        }
    }
}

/// Main application configuration.
///
/// Aggregates the sub-config modules into one struct the composition root
/// passes around.
#[derive(Debug, Clone)]
pub struct Config {
    // Core
    pub mode: Mode,
    pub trading_pairs: Vec<String>,
    pub database_url: String,
    pub submit_timeout_ms: u64,

    // Venue (from BinanceEnvConfig)
    pub binance_api_key: String,
    pub binance_secret_key: String,
    pub binance_base_url: String,
    pub recv_window_ms: u64,

    // Observability (from ObservabilityEnvConfig)
    pub observability_enabled: bool,
    pub observability_interval_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "paper".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let trading_pairs: Vec<String> = env::var("TRADING_PAIRS")
            .unwrap_or_else(|_| "BTCUSDT,ETHUSDT".to_string())
            .split(',')
            .map(|pair| pair.trim().to_uppercase())
            .filter(|pair| !pair.is_empty())
            .collect();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/tradedesk.db".to_string());

        let submit_timeout_ms = env::var("SUBMIT_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse::<u64>()
            .unwrap_or(10_000);

        let venue = BinanceEnvConfig::from_env();
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            mode,
            trading_pairs,
            database_url,
            submit_timeout_ms,

            // Venue
            binance_api_key: venue.api_key,
            binance_secret_key: venue.secret_key,
            binance_base_url: venue.base_url,
            recv_window_ms: venue.recv_window_ms,

            // Observability
            observability_enabled: observability.enabled,
            observability_interval_seconds: observability.interval_seconds,
        })
    }

    /// The credential pair handed to the gateway at construction and on
    /// refresh.
    pub fn venue_credentials(&self) -> VenueCredentials {
        VenueCredentials {
            api_key: self.binance_api_key.clone(),
            secret_key: self.binance_secret_key.clone(),
        }
    }
}

//! Static strategy status source.
//!
//! The dashboard renders a strategy status widget; the execution core
//! treats the content as opaque. This source describes the configured
//! session once at startup and hands out clones.

use crate::domain::ports::StrategyStateSource;
use crate::domain::trading::types::StrategyState;
use async_trait::async_trait;
use serde_json::json;

pub struct StaticStrategyState {
    state: StrategyState,
}

impl StaticStrategyState {
    pub fn new(mode: &str, symbols: &[String]) -> Self {
        Self {
            state: StrategyState(json!({
                "strategy": "manual",
                "mode": mode,
                "symbols": symbols,
                "startedAt": chrono::Utc::now().to_rfc3339(),
            })),
        }
    }
}

#[async_trait]
impl StrategyStateSource for StaticStrategyState {
    async fn current(&self) -> StrategyState {
        self.state.clone()
    }
}

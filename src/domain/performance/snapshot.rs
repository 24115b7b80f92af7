use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time performance metrics derived from the ledger.
///
/// A snapshot is never stored. It is recomputed from ledger contents on
/// every query, so two snapshots taken with no intervening append are
/// identical. That is why it carries no generation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    /// Sum of (exit price - entry price) x quantity over closed positions.
    pub realized_pnl: Decimal,
    /// Fraction of closed trades with positive P&L. `None` until the first
    /// round trip closes.
    pub win_rate: Option<Decimal>,
    /// Filled orders recorded in the ledger.
    pub trades: u64,
    /// Closed position chunks produced by FIFO matching.
    pub closed_trades: u64,
    pub winning_trades: u64,
    /// Net signed open quantity per symbol. Positive long, negative short.
    /// Flat symbols are omitted.
    pub exposure: BTreeMap<String, Decimal>,
    /// Total ledger entries seen, including rejected and failed attempts.
    pub ledger_entries: u64,
}

impl PerformanceSnapshot {
    pub fn empty() -> Self {
        Self {
            realized_pnl: Decimal::ZERO,
            win_rate: None,
            trades: 0,
            closed_trades: 0,
            winning_trades: 0,
            exposure: BTreeMap::new(),
            ledger_entries: 0,
        }
    }
}

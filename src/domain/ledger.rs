//! Append-only order ledger
//!
//! The ledger is the authoritative trade history: one immutable entry per
//! terminal order attempt, identified by the client order id. Everything
//! the dashboard reports about past trades is derived from here, never
//! from venue state directly.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::LedgerError;
use crate::domain::trading::types::Order;

/// How an entry reached the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    /// Written in-line with a live submission.
    Live,
    /// Recovered from venue order history by the startup reconciliation
    /// pass, closing a gap left by a crash or a failed append.
    Reconciled,
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySource::Live => write!(f, "live"),
            EntrySource::Reconciled => write!(f, "reconciled"),
        }
    }
}

impl FromStr for EntrySource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(EntrySource::Live),
            "reconciled" => Ok(EntrySource::Reconciled),
            _ => Err(()),
        }
    }
}

/// One immutable ledger record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Monotonic position in the ledger, assigned on append.
    pub sequence: u64,
    pub order: Order,
    /// The venue's raw response or history record for this attempt.
    pub venue_ref: Option<serde_json::Value>,
    pub source: EntrySource,
    pub recorded_at: i64,
}

/// An entry as handed to [`OrderLedger::append`]. The ledger assigns the
/// sequence number.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub order: Order,
    pub venue_ref: Option<serde_json::Value>,
    pub source: EntrySource,
    pub recorded_at: i64,
}

impl NewLedgerEntry {
    /// Entry for an order that just reached its terminal status live.
    pub fn live(order: Order, venue_ref: Option<serde_json::Value>) -> Self {
        debug_assert!(order.is_terminal());
        Self {
            order,
            venue_ref,
            source: EntrySource::Live,
            recorded_at: Utc::now().timestamp_millis(),
        }
    }

    /// Entry recovered from venue history during reconciliation.
    pub fn reconciled(order: Order, venue_ref: Option<serde_json::Value>) -> Self {
        debug_assert!(order.is_terminal());
        Self {
            order,
            venue_ref,
            source: EntrySource::Reconciled,
            recorded_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Durable, append-only store of terminal order attempts.
///
/// Append is the only mutation. Entries are never rewritten; `stream_all`
/// replays them lazily in append order and can be restarted at will.
/// Implementations must reject a second entry for the same client order id
/// with [`LedgerError::DuplicateOrder`].
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Append one entry and return its assigned sequence number.
    async fn append(&self, entry: NewLedgerEntry) -> Result<u64, LedgerError>;

    /// Lazily stream every entry in append order.
    async fn stream_all(
        &self,
    ) -> Result<BoxStream<'_, Result<LedgerEntry, LedgerError>>, LedgerError>;

    async fn count(&self) -> Result<u64, LedgerError>;

    /// Whether an entry for this client order id exists. Reconciliation
    /// uses this to tell recorded history from gaps.
    async fn contains_order(&self, order_id: &str) -> Result<bool, LedgerError>;
}

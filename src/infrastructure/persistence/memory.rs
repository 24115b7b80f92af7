//! In-memory order ledger.
//!
//! Same append-only contract as the SQLite ledger without the durability:
//! one entry per order id, insertion order preserved, streamed reads see
//! the entries present when the stream was opened. Backs unit tests and
//! ephemeral runs.

use crate::domain::errors::LedgerError;
use crate::domain::ledger::{LedgerEntry, NewLedgerEntry, OrderLedger};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Default)]
struct Entries {
    entries: Vec<LedgerEntry>,
    order_ids: HashSet<String>,
}

pub struct MemoryLedger {
    inner: RwLock<Entries>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Entries::default()),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderLedger for MemoryLedger {
    async fn append(&self, entry: NewLedgerEntry) -> Result<u64, LedgerError> {
        let mut inner = self.inner.write().await;

        if !inner.order_ids.insert(entry.order.id.clone()) {
            return Err(LedgerError::DuplicateOrder {
                order_id: entry.order.id,
            });
        }

        let sequence = inner.entries.len() as u64 + 1;
        inner.entries.push(LedgerEntry {
            sequence,
            order: entry.order,
            venue_ref: entry.venue_ref,
            source: entry.source,
            recorded_at: entry.recorded_at,
        });

        Ok(sequence)
    }

    async fn stream_all(
        &self,
    ) -> Result<BoxStream<'_, Result<LedgerEntry, LedgerError>>, LedgerError> {
        // Cloned under the read lock: the stream is a snapshot, appends
        // landing afterwards are not observed mid-iteration.
        let snapshot = self.inner.read().await.entries.clone();
        Ok(Box::pin(stream::iter(snapshot.into_iter().map(Ok))))
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        Ok(self.inner.read().await.entries.len() as u64)
    }

    async fn contains_order(&self, order_id: &str) -> Result<bool, LedgerError> {
        Ok(self.inner.read().await.order_ids.contains(order_id))
    }
}

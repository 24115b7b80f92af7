//! SQLite-backed order ledger.
//!
//! One row per order attempt, append-only. The UNIQUE constraint on
//! `order_id` is what makes at-most-once-per-id hold under concurrent
//! placement: the insert either lands or comes back as a duplicate.

use crate::domain::errors::LedgerError;
use crate::domain::ledger::{EntrySource, LedgerEntry, NewLedgerEntry, OrderLedger};
use crate::domain::trading::types::{Order, OrderSide, OrderStatus};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for SqliteLedger {
    async fn append(&self, entry: NewLedgerEntry) -> Result<u64, LedgerError> {
        let order = &entry.order;

        let venue_ref = match &entry.venue_ref {
            Some(value) => Some(serde_json::to_string(value).map_err(LedgerError::persistence)?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO ledger (order_id, symbol, side, quantity, status, fill_price,
                                reason, venue_ref, source, requested_at, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.symbol)
        .bind(order.side.to_string())
        .bind(order.quantity.to_string())
        .bind(order.status.to_string())
        .bind(order.fill_price.map(|price| price.to_string()))
        .bind(&order.reason)
        .bind(venue_ref)
        .bind(entry.source.to_string())
        .bind(order.requested_at)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid() as u64),
            Err(sqlx::Error::Database(db_err))
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                Err(LedgerError::DuplicateOrder {
                    order_id: order.id.clone(),
                })
            }
            Err(err) => Err(LedgerError::persistence(err)),
        }
    }

    async fn stream_all(
        &self,
    ) -> Result<BoxStream<'_, Result<LedgerEntry, LedgerError>>, LedgerError> {
        let stream = sqlx::query("SELECT * FROM ledger ORDER BY sequence ASC")
            .fetch(&self.pool)
            .map(|row| match row {
                Ok(row) => entry_from_row(&row),
                Err(err) => Err(LedgerError::persistence(err)),
            });

        Ok(Box::pin(stream))
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM ledger")
            .fetch_one(&self.pool)
            .await
            .map_err(LedgerError::persistence)?;

        let count: i64 = row.try_get("count").map_err(LedgerError::persistence)?;
        Ok(count as u64)
    }

    async fn contains_order(&self, order_id: &str) -> Result<bool, LedgerError> {
        let row = sqlx::query("SELECT 1 FROM ledger WHERE order_id = ? LIMIT 1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(LedgerError::persistence)?;

        Ok(row.is_some())
    }
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry, LedgerError> {
    // A row that stopped parsing is a corrupt ledger, not a recoverable
    // condition; surface it instead of folding a default into the P&L.
    fn corrupt(column: &str, detail: impl std::fmt::Display) -> LedgerError {
        LedgerError::persistence(std::io::Error::other(format!(
            "corrupt ledger column {}: {}",
            column, detail
        )))
    }

    let side_text: String = row.try_get("side").map_err(LedgerError::persistence)?;
    let side = OrderSide::from_str(&side_text).map_err(|_| corrupt("side", &side_text))?;

    let status_text: String = row.try_get("status").map_err(LedgerError::persistence)?;
    let status =
        OrderStatus::from_str(&status_text).map_err(|_| corrupt("status", &status_text))?;

    let quantity_text: String = row.try_get("quantity").map_err(LedgerError::persistence)?;
    let quantity = Decimal::from_str(&quantity_text).map_err(|e| corrupt("quantity", e))?;

    let fill_price = match row
        .try_get::<Option<String>, _>("fill_price")
        .map_err(LedgerError::persistence)?
    {
        Some(text) => Some(Decimal::from_str(&text).map_err(|e| corrupt("fill_price", e))?),
        None => None,
    };

    let venue_ref = match row
        .try_get::<Option<String>, _>("venue_ref")
        .map_err(LedgerError::persistence)?
    {
        Some(text) => Some(serde_json::from_str(&text).map_err(|e| corrupt("venue_ref", e))?),
        None => None,
    };

    let source_text: String = row.try_get("source").map_err(LedgerError::persistence)?;
    let source =
        EntrySource::from_str(&source_text).map_err(|_| corrupt("source", &source_text))?;

    let sequence: i64 = row.try_get("sequence").map_err(LedgerError::persistence)?;

    Ok(LedgerEntry {
        sequence: sequence as u64,
        order: Order {
            id: row.try_get("order_id").map_err(LedgerError::persistence)?,
            symbol: row.try_get("symbol").map_err(LedgerError::persistence)?,
            side,
            quantity,
            status,
            fill_price,
            reason: row.try_get("reason").map_err(LedgerError::persistence)?,
            requested_at: row
                .try_get("requested_at")
                .map_err(LedgerError::persistence)?,
        },
        venue_ref,
        source,
        recorded_at: row
            .try_get("recorded_at")
            .map_err(LedgerError::persistence)?,
    })
}

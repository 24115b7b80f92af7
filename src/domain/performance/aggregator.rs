use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

use crate::domain::ledger::LedgerEntry;
use crate::domain::performance::snapshot::PerformanceSnapshot;
use crate::domain::trading::types::{OrderSide, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionSide {
    Flat,
    Long,
    Short,
}

impl PositionSide {
    fn of(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        }
    }
}

#[derive(Debug, Clone)]
struct Lot {
    price: Decimal,
    quantity: Decimal,
}

/// Open position in one symbol: direction plus the FIFO queue of entry lots
/// still waiting to be matched.
#[derive(Debug)]
struct SymbolBook {
    side: PositionSide,
    open_lots: VecDeque<Lot>,
}

impl SymbolBook {
    fn new() -> Self {
        Self {
            side: PositionSide::Flat,
            open_lots: VecDeque::new(),
        }
    }

    /// Net signed open quantity. Positive long, negative short.
    fn exposure(&self) -> Decimal {
        let open: Decimal = self.open_lots.iter().map(|lot| lot.quantity).sum();
        match self.side {
            PositionSide::Short => -open,
            _ => open,
        }
    }
}

impl Default for SymbolBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds ledger entries into running performance totals, reconstructing
/// trades by FIFO matching fills against open lots per symbol.
///
/// The fold is rebuilt from scratch for every snapshot query, so reported
/// metrics are a pure function of ledger contents and cannot drift from
/// the recorded history.
#[derive(Debug, Default)]
pub struct PnlFold {
    books: BTreeMap<String, SymbolBook>,
    realized_pnl: Decimal,
    trades: u64,
    closed_trades: u64,
    winning_trades: u64,
    entries: u64,
}

impl PnlFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut fold = Self::new();
        for entry in entries {
            fold.absorb(entry);
        }
        fold
    }

    /// Fold one ledger entry into the running totals. Entries must arrive
    /// in ledger order; only fills move the books.
    pub fn absorb(&mut self, entry: &LedgerEntry) {
        self.entries += 1;
        if entry.order.status != OrderStatus::Filled {
            return;
        }
        let Some(price) = entry.order.fill_price else {
            return;
        };
        self.trades += 1;

        let book = self
            .books
            .entry(entry.order.symbol.clone())
            .or_default();
        let side = entry.order.side;
        let mut qty_to_process = entry.order.quantity;

        if book.side == PositionSide::Flat {
            book.side = PositionSide::of(side);
            book.open_lots.push_back(Lot {
                price,
                quantity: qty_to_process,
            });
            return;
        }

        let is_increasing = book.side == PositionSide::of(side);
        if is_increasing {
            book.open_lots.push_back(Lot {
                price,
                quantity: qty_to_process,
            });
            return;
        }

        // Decreasing or reversing: match against open lots, oldest first.
        while qty_to_process > Decimal::ZERO {
            let Some(mut lot) = book.open_lots.pop_front() else {
                break;
            };
            let match_qty = lot.quantity.min(qty_to_process);
            let lot_pnl = match book.side {
                PositionSide::Long => (price - lot.price) * match_qty,
                PositionSide::Short => (lot.price - price) * match_qty,
                PositionSide::Flat => unreachable!(),
            };

            self.realized_pnl += lot_pnl;
            self.closed_trades += 1;
            if lot_pnl > Decimal::ZERO {
                self.winning_trades += 1;
            }

            qty_to_process -= match_qty;
            lot.quantity -= match_qty;
            if lot.quantity > Decimal::ZERO {
                book.open_lots.push_front(lot);
            }
        }

        if qty_to_process > Decimal::ZERO {
            // Reversed direction
            book.side = PositionSide::of(side);
            book.open_lots.push_back(Lot {
                price,
                quantity: qty_to_process,
            });
        } else if book.open_lots.is_empty() {
            book.side = PositionSide::Flat;
        }
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let exposure: BTreeMap<String, Decimal> = self
            .books
            .iter()
            .filter_map(|(symbol, book)| {
                let net = book.exposure();
                (!net.is_zero()).then(|| (symbol.clone(), net))
            })
            .collect();

        let win_rate = (self.closed_trades > 0)
            .then(|| Decimal::from(self.winning_trades) / Decimal::from(self.closed_trades));

        PerformanceSnapshot {
            realized_pnl: self.realized_pnl,
            win_rate,
            trades: self.trades,
            closed_trades: self.closed_trades,
            winning_trades: self.winning_trades,
            exposure,
            ledger_entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::EntrySource;
    use crate::domain::trading::types::{Fill, Order, ValidatedOrder};
    use rust_decimal_macros::dec;

    fn fill_entry(
        sequence: u64,
        symbol: &str,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> LedgerEntry {
        let validated = ValidatedOrder::new(symbol, side, quantity);
        let fill = Fill {
            price,
            quantity,
            venue_order_id: sequence.to_string(),
            raw: serde_json::Value::Null,
        };
        LedgerEntry {
            sequence,
            order: Order::pending(&validated).into_filled(&fill),
            venue_ref: None,
            source: EntrySource::Live,
            recorded_at: validated.requested_at,
        }
    }

    fn rejected_entry(sequence: u64, symbol: &str) -> LedgerEntry {
        let validated = ValidatedOrder::new(symbol, OrderSide::Buy, dec!(1));
        LedgerEntry {
            sequence,
            order: Order::pending(&validated).into_rejected("insufficient balance"),
            venue_ref: None,
            source: EntrySource::Live,
            recorded_at: validated.requested_at,
        }
    }

    #[test]
    fn test_empty_ledger_snapshot() {
        let snapshot = PnlFold::new().snapshot();
        assert_eq!(snapshot, PerformanceSnapshot::empty());
    }

    #[test]
    fn test_realized_pnl_and_win_rate() {
        // Two round trips: +100 and -40.
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            fill_entry(2, "BTCUSDT", OrderSide::Sell, dec!(200), dec!(1)),
            fill_entry(3, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            fill_entry(4, "BTCUSDT", OrderSide::Sell, dec!(60), dec!(1)),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, dec!(60));
        assert_eq!(snapshot.win_rate, Some(dec!(0.5)));
        assert_eq!(snapshot.closed_trades, 2);
        assert_eq!(snapshot.winning_trades, 1);
        assert!(snapshot.exposure.is_empty());
    }

    #[test]
    fn test_short_round_trip() {
        let entries = vec![
            fill_entry(1, "ETHUSDT", OrderSide::Sell, dec!(100), dec!(2)),
            fill_entry(2, "ETHUSDT", OrderSide::Buy, dec!(90), dec!(2)),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, dec!(20));
        assert_eq!(snapshot.win_rate, Some(dec!(1)));
    }

    #[test]
    fn test_open_position_exposure() {
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(96000), dec!(0.5)),
            fill_entry(2, "ETHUSDT", OrderSide::Sell, dec!(3400), dec!(2)),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, Decimal::ZERO);
        assert_eq!(snapshot.win_rate, None);
        assert_eq!(snapshot.exposure.get("BTCUSDT"), Some(&dec!(0.5)));
        assert_eq!(snapshot.exposure.get("ETHUSDT"), Some(&dec!(-2)));
    }

    #[test]
    fn test_partial_close_leaves_remainder_open() {
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(2)),
            fill_entry(2, "BTCUSDT", OrderSide::Sell, dec!(110), dec!(1)),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, dec!(10));
        assert_eq!(snapshot.exposure.get("BTCUSDT"), Some(&dec!(1)));
    }

    #[test]
    fn test_oversized_close_reverses_position() {
        // Long 1 @ 100, then sell 2 @ 110: closes +10 and opens a short 1.
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            fill_entry(2, "BTCUSDT", OrderSide::Sell, dec!(110), dec!(2)),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, dec!(10));
        assert_eq!(snapshot.exposure.get("BTCUSDT"), Some(&dec!(-1)));
    }

    #[test]
    fn test_fifo_matches_oldest_lot_first() {
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            fill_entry(2, "BTCUSDT", OrderSide::Buy, dec!(120), dec!(1)),
            fill_entry(3, "BTCUSDT", OrderSide::Sell, dec!(110), dec!(1)),
        ];

        // The 100 lot matches first: +10, not -10.
        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, dec!(10));
        assert_eq!(snapshot.exposure.get("BTCUSDT"), Some(&dec!(1)));
    }

    #[test]
    fn test_symbols_tracked_independently() {
        // A BTC buy and an ETH sell never match each other.
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            fill_entry(2, "ETHUSDT", OrderSide::Sell, dec!(100), dec!(1)),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.realized_pnl, Decimal::ZERO);
        assert_eq!(snapshot.closed_trades, 0);
        assert_eq!(snapshot.exposure.len(), 2);
    }

    #[test]
    fn test_non_fills_are_counted_but_do_not_move_books() {
        let entries = vec![
            rejected_entry(1, "BTCUSDT"),
            fill_entry(2, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            rejected_entry(3, "BTCUSDT"),
        ];

        let snapshot = PnlFold::from_entries(&entries).snapshot();
        assert_eq!(snapshot.ledger_entries, 3);
        assert_eq!(snapshot.trades, 1);
        assert_eq!(snapshot.exposure.get("BTCUSDT"), Some(&dec!(1)));
    }

    #[test]
    fn test_snapshot_is_pure_function_of_entries() {
        let entries = vec![
            fill_entry(1, "BTCUSDT", OrderSide::Buy, dec!(100), dec!(1)),
            fill_entry(2, "BTCUSDT", OrderSide::Sell, dec!(150), dec!(1)),
        ];

        let fold = PnlFold::from_entries(&entries);
        assert_eq!(fold.snapshot(), fold.snapshot());
        assert_eq!(fold.snapshot(), PnlFold::from_entries(&entries).snapshot());
    }
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::domain::errors::ValidationError;
use crate::domain::trading::types::{OrderRequest, OrderSide, ValidatedOrder};

/// Lot constraints for one symbol, mirroring the venue's LOT_SIZE filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotRule {
    pub min_quantity: Decimal,
    pub step_size: Decimal,
}

/// Lot rules for the majors. Unknown symbols fall back to a conservative
/// rule when explicitly configured, and are rejected otherwise.
fn built_in_rule(symbol: &str) -> Option<LotRule> {
    let rule = match symbol {
        "BTCUSDT" => LotRule {
            min_quantity: dec!(0.00001),
            step_size: dec!(0.00001),
        },
        "ETHUSDT" => LotRule {
            min_quantity: dec!(0.0001),
            step_size: dec!(0.0001),
        },
        "BNBUSDT" | "SOLUSDT" => LotRule {
            min_quantity: dec!(0.001),
            step_size: dec!(0.001),
        },
        "ADAUSDT" => LotRule {
            min_quantity: dec!(0.1),
            step_size: dec!(0.1),
        },
        "XRPUSDT" | "DOGEUSDT" => LotRule {
            min_quantity: dec!(1),
            step_size: dec!(1),
        },
        _ => return None,
    };
    Some(rule)
}

const FALLBACK_RULE: LotRule = LotRule {
    min_quantity: dec!(0.001),
    step_size: dec!(0.001),
};

/// Static validation table: the tradable universe and its lot rules.
///
/// Validation is pure. It never consults the venue, so a request that
/// passes here can still be rejected downstream (balance, filters the
/// venue enforces that we do not model).
#[derive(Debug, Clone)]
pub struct TradingRules {
    rules: BTreeMap<String, LotRule>,
}

impl TradingRules {
    /// Build the table for a configured symbol universe. Symbols without a
    /// built-in rule get [`FALLBACK_RULE`].
    pub fn for_symbols<S: AsRef<str>>(symbols: &[S]) -> Self {
        let mut rules = BTreeMap::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_ascii_uppercase();
            if symbol.is_empty() {
                continue;
            }
            let rule = built_in_rule(&symbol).unwrap_or(FALLBACK_RULE);
            rules.insert(symbol, rule);
        }
        Self { rules }
    }

    /// The configured universe, sorted. Reconciliation walks this list when
    /// asking the venue for order history.
    pub fn symbols(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.rules.contains_key(symbol)
    }

    /// Validate a raw dashboard request into a [`ValidatedOrder`].
    ///
    /// Checks run symbol, then side, then quantity; the first failure wins.
    pub fn validate(&self, request: &OrderRequest) -> Result<ValidatedOrder, ValidationError> {
        let symbol = request.symbol.trim().to_ascii_uppercase();
        let rule = self
            .rules
            .get(&symbol)
            .ok_or_else(|| ValidationError::InvalidSymbol {
                symbol: request.symbol.clone(),
            })?;

        let side: OrderSide =
            request
                .order_type
                .parse()
                .map_err(|_| ValidationError::InvalidSide {
                    value: request.order_type.clone(),
                })?;

        let quantity = request.quantity;
        if quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidQuantity {
                symbol,
                quantity,
                reason: "must be positive".to_string(),
            });
        }
        if quantity < rule.min_quantity {
            return Err(ValidationError::InvalidQuantity {
                symbol,
                quantity,
                reason: format!("below minimum lot {}", rule.min_quantity),
            });
        }
        if !(quantity % rule.step_size).is_zero() {
            return Err(ValidationError::InvalidQuantity {
                symbol,
                quantity,
                reason: format!("not a multiple of step size {}", rule.step_size),
            });
        }

        Ok(ValidatedOrder::new(symbol, side, quantity))
    }
}

impl Default for TradingRules {
    /// The out-of-the-box universe matches the dashboard's default coin
    /// selection.
    fn default() -> Self {
        Self::for_symbols(&["BTCUSDT", "ETHUSDT"])
    }
}

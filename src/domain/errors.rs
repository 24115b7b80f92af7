use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by order validation, before anything touches the venue
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown symbol: {symbol}")]
    InvalidSymbol { symbol: String },

    #[error("Invalid side '{value}': expected BUY or SELL")]
    InvalidSide { value: String },

    #[error("Invalid quantity {quantity} for {symbol}: {reason}")]
    InvalidQuantity {
        symbol: String,
        quantity: Decimal,
        reason: String,
    },
}

/// Errors surfaced by the exchange gateway after a submission attempt
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The venue never answered. Retries are exhausted by the time this
    /// surfaces, and the order's outcome at the venue is unknown.
    #[error("Venue unreachable: {reason}")]
    NetworkTimeout { reason: String },

    /// The venue answered and refused the order. Definitively not executed.
    #[error("Venue rejected order (code {code}): {reason}")]
    VenueRejected { code: i64, reason: String },

    /// Credentials were refused. Every subsequent submission would fail the
    /// same way until they are refreshed.
    #[error("Venue authentication failed: {reason}")]
    AuthFailure { reason: String },
}

/// Errors raised by the order ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger persistence failed: {source}")]
    Persistence {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Ledger already holds an entry for order {order_id}")]
    DuplicateOrder { order_id: String },
}

impl LedgerError {
    pub fn persistence(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        LedgerError::Persistence {
            source: Box::new(source),
        }
    }
}

/// Top-level error for a dashboard-facing trading operation
#[derive(Debug, Error)]
pub enum TradingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The venue filled the order but the ledger append failed. The fill is
    /// real money that the books do not show until reconciliation runs.
    #[error("Order {order_id} filled at the venue but could not be recorded: {source}")]
    OutcomeUnknown {
        order_id: String,
        #[source]
        source: LedgerError,
    },

    #[error("Trading halted after credential failure; refresh credentials to resume")]
    Halted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validation_error_formatting() {
        let err = ValidationError::InvalidQuantity {
            symbol: "BTCUSDT".to_string(),
            quantity: dec!(0.000001),
            reason: "below minimum lot 0.00001".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("BTCUSDT"));
        assert!(msg.contains("0.000001"));
        assert!(msg.contains("minimum lot"));
    }

    #[test]
    fn test_gateway_rejection_formatting() {
        let err = GatewayError::VenueRejected {
            code: -2010,
            reason: "Account has insufficient balance".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("-2010"));
        assert!(msg.contains("insufficient balance"));
    }

    #[test]
    fn test_trading_error_wraps_validation_transparently() {
        let err: TradingError = ValidationError::InvalidSymbol {
            symbol: "DOGEBTC".to_string(),
        }
        .into();

        assert_eq!(err.to_string(), "Unknown symbol: DOGEBTC");
    }

    #[test]
    fn test_outcome_unknown_names_the_order() {
        let err = TradingError::OutcomeUnknown {
            order_id: "a1b2c3".to_string(),
            source: LedgerError::persistence(std::io::Error::other("disk full")),
        };

        let msg = err.to_string();
        assert!(msg.contains("a1b2c3"));
        assert!(msg.contains("could not be recorded"));
    }
}

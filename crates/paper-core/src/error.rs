//! Error Types for the Paper Trader

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    /// Non-positive or fractional share count
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Non-positive execution price
    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),

    /// Negative cash balance
    #[error("Invalid balance: {0}")]
    InvalidBalance(Decimal),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        needed: Decimal,
        available: Decimal,
    },

    #[error("No position held in {0}")]
    NoPosition(String),

    #[error("Insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },

    /// Storage collaborator failed; never surfaced as a domain error
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Expected trade rejections, as opposed to infrastructure failures
    pub const fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity(_)
                | Self::InvalidPrice(_)
                | Self::InvalidBalance(_)
                | Self::InsufficientFunds { .. }
                | Self::NoPosition(_)
                | Self::InsufficientShares { .. }
        )
    }

    /// Convert to a message the trade screen can show as-is
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidQuantity(_) => "Please enter a whole number of shares.".into(),
            Self::InvalidPrice(_) => "That price is not valid.".into(),
            Self::InvalidBalance(_) => "The balance cannot be negative.".into(),
            Self::InsufficientFunds { needed, available } => format!(
                "You need ${:.2} but only have ${:.2} available.",
                needed, available
            ),
            Self::NoPosition(symbol) => format!("You don't own any shares of {symbol}."),
            Self::InsufficientShares { symbol, held, .. } => {
                format!("You only own {held} shares of {symbol}.")
            }
            _ => "Something went wrong. Your account was not changed.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_domain_classification() {
        assert!(SimError::NoPosition("AAPL".into()).is_domain());
        assert!(SimError::InsufficientFunds { needed: dec!(10), available: dec!(5) }.is_domain());
        assert!(!SimError::StorageUnavailable("disk full".into()).is_domain());
        assert!(!SimError::Config("bad".into()).is_domain());
    }

    #[test]
    fn test_user_message_mentions_symbol() {
        let err = SimError::InsufficientShares { symbol: "TSLA".into(), requested: 5, held: 2 };
        assert_eq!(err.user_message(), "You only own 2 shares of TSLA.");
    }

    #[test]
    fn test_negative_balance_message() {
        let err = SimError::InvalidBalance(dec!(-1));
        assert!(err.is_domain());
        assert_eq!(err.user_message(), "The balance cannot be negative.");
    }
}

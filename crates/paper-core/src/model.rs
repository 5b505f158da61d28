//! Domain Models
//!
//! Core data types for the simulated market and a user's paper account.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::watchlist::Watchlist;

/// Cash every new account starts with
pub const DEFAULT_STARTING_BALANCE: Decimal = dec!(10000);

/// Round a monetary amount for display or quoting (2 dp, half away from zero)
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalise a ticker so "aapl" and "AAPL" address the same position
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Opaque identifier of the logged-in user, supplied by the auth layer
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a listed company
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub symbol: &'static str,
    pub company_name: &'static str,
    pub sector: &'static str,
}

/// A simulated quote for one symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,

    pub company_name: String,

    pub sector: String,

    /// Last simulated price, always > 0
    pub price: Decimal,

    /// Price before the most recent tick
    pub previous_close: Decimal,

    /// `price - previous_close`
    pub change: Decimal,

    /// `change / previous_close * 100`
    pub change_percent: Decimal,

    pub volume: u64,

    pub market_cap: u64,
}

impl Quote {
    /// A quote with no movement yet
    pub fn new(entry: &CatalogEntry, price: Decimal, volume: u64, market_cap: u64) -> Self {
        Self {
            symbol: entry.symbol.to_string(),
            company_name: entry.company_name.to_string(),
            sector: entry.sector.to_string(),
            price,
            previous_close: price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume,
            market_cap,
        }
    }
}

/// One point of a historical chart series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// An open holding in one symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,

    pub company_name: String,

    /// Shares held, always > 0 while the position exists
    pub quantity: u64,

    /// Weighted average cost per share
    pub average_price: Decimal,

    /// Authoritative cost accumulator; `average_price * quantity`
    pub total_cost: Decimal,

    /// Most recent price seen for this symbol (execution or mark-to-market)
    pub last_price: Decimal,
}

impl Position {
    pub fn open(
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        quantity: u64,
        unit_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            quantity,
            average_price: unit_price,
            total_cost: unit_price * Decimal::from(quantity),
            last_price: unit_price,
        }
    }

    /// Value of the holding at `price`
    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.quantity) * price
    }

    /// Unrealized P&L at `price`
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        self.market_value(price) - self.total_cost
    }
}

/// Direction of a trade
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable entry in the transaction log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Time-ordered identifier (UUID v7)
    pub id: Uuid,

    pub symbol: String,

    pub company_name: String,

    pub quantity: u64,

    /// Execution price per share
    pub price: Decimal,

    /// `price * quantity`
    pub total: Decimal,

    #[serde(rename = "type")]
    pub side: TradeSide,

    pub date: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        side: TradeSide,
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        quantity: u64,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            symbol: symbol.into(),
            company_name: company_name.into(),
            quantity,
            price,
            total: price * Decimal::from(quantity),
            side,
            date: Utc::now(),
        }
    }
}

/// Receipt for an accepted trade
#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    /// The transaction appended to the log
    pub transaction: Transaction,

    /// `(price - average_price) * quantity` for sells, zero for buys
    pub realized_pnl: Decimal,

    /// Cash left after the trade
    pub balance_after: Decimal,
}

/// The complete per-user paper account
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    /// Available cash, never negative
    pub balance: Decimal,

    /// Open positions keyed by symbol
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,

    /// Append-only trade log, oldest first
    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub watchlist: Watchlist,
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_BALANCE)
    }
}

impl AccountState {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            balance: starting_balance,
            positions: BTreeMap::new(),
            transactions: Vec::new(),
            watchlist: Watchlist::new(),
        }
    }

    /// Sum of cost basis over all open positions
    pub fn total_cost_basis(&self) -> Decimal {
        self.positions.values().map(|p| p.total_cost).sum()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(&normalize_symbol(symbol))
    }

    /// Transactions newest first, as the history screen shows them
    pub fn recent_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().rev()
    }

    /// History filtered to one symbol, newest first
    pub fn transactions_for<'a>(&'a self, symbol: &str) -> impl Iterator<Item = &'a Transaction> {
        let symbol = normalize_symbol(symbol);
        self.recent_transactions().filter(move |t| t.symbol == symbol)
    }

    /// History filtered to one side, newest first
    pub fn transactions_of(&self, side: TradeSide) -> impl Iterator<Item = &Transaction> {
        self.recent_transactions().filter(move |t| t.side == side)
    }
}

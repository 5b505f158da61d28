//! Simulated Market
//!
//! Synthetic quotes and the lookup seam the ledger valuations read prices through.

mod board;
mod catalog;
mod simulator;

pub use board::{MarketBoard, SortDirection, SortKey};
pub use catalog::DEFAULT_CATALOG;
pub use simulator::{PriceSimulator, PRICE_FLOOR, VOLUME_FLOOR};

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::model::Quote;

/// Anything that can answer "what is this symbol trading at?"
///
/// The ledger never calls the simulator; callers hand it one of these.
pub trait QuoteSource {
    fn quote(&self, symbol: &str) -> Option<&Quote>;

    fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.quote(symbol).map(|q| q.price)
    }
}

impl QuoteSource for HashMap<String, Quote> {
    fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.get(symbol)
    }
}

impl QuoteSource for [Quote] {
    fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.iter().find(|q| q.symbol == symbol)
    }
}

impl QuoteSource for Vec<Quote> {
    fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.as_slice().quote(symbol)
    }
}

//! Market Board
//!
//! Holds the current quotes between refreshes and answers the queries the
//! market, search and overview screens make.

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;

use super::{PriceSimulator, QuoteSource, DEFAULT_CATALOG};
use crate::model::{normalize_symbol, CatalogEntry, Quote};

/// Column the market list is ordered by
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    Symbol,
    Price,
    #[default]
    Change,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

pub struct MarketBoard {
    simulator: PriceSimulator,
    quotes: Vec<Quote>,
}

impl MarketBoard {
    /// Board over the default catalog
    pub fn new(simulator: PriceSimulator) -> Self {
        Self::with_catalog(simulator, DEFAULT_CATALOG)
    }

    pub fn with_catalog(mut simulator: PriceSimulator, catalog: &[CatalogEntry]) -> Self {
        let quotes = simulator.initialize_universe(catalog);
        Self { simulator, quotes }
    }

    /// Apply one simulator tick to every quote
    pub fn refresh(&mut self) {
        self.quotes = self.simulator.tick(&self.quotes);
        tracing::debug!(quotes = self.quotes.len(), "market refreshed");
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn simulator_mut(&mut self) -> &mut PriceSimulator {
        &mut self.simulator
    }

    /// Current prices keyed by symbol
    pub fn prices(&self) -> HashMap<String, Decimal> {
        self.quotes.iter().map(|q| (q.symbol.clone(), q.price)).collect()
    }

    pub fn sorted(&self, key: SortKey, direction: SortDirection) -> Vec<&Quote> {
        let mut list: Vec<&Quote> = self.quotes.iter().collect();
        list.sort_by(|a, b| {
            let ordering = match key {
                SortKey::Symbol => a.symbol.cmp(&b.symbol),
                SortKey::Price => a.price.cmp(&b.price),
                SortKey::Change => a.change_percent.cmp(&b.change_percent),
            };
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        list
    }

    /// Case-insensitive match on symbol, company name or sector
    pub fn search(&self, query: &str) -> Vec<&Quote> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.quotes
            .iter()
            .filter(|q| {
                q.symbol.to_lowercase().contains(&needle)
                    || q.company_name.to_lowercase().contains(&needle)
                    || q.sector.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Best performers by change percent, best first
    pub fn top_movers(&self, n: usize) -> Vec<&Quote> {
        let mut list = self.by_performance();
        list.truncate(n);
        list
    }

    /// Worst performers by change percent, worst first
    pub fn bottom_movers(&self, n: usize) -> Vec<&Quote> {
        let mut list = self.by_performance();
        list.reverse();
        list.truncate(n);
        list
    }

    fn by_performance(&self) -> Vec<&Quote> {
        let mut list: Vec<&Quote> = self.quotes.iter().collect();
        list.sort_by(|a, b| match b.change_percent.cmp(&a.change_percent) {
            Ordering::Equal => a.symbol.cmp(&b.symbol),
            other => other,
        });
        list
    }
}

impl QuoteSource for MarketBoard {
    fn quote(&self, symbol: &str) -> Option<&Quote> {
        let symbol = normalize_symbol(symbol);
        self.quotes.iter().find(|q| q.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn board() -> MarketBoard {
        let mut board = MarketBoard::new(PriceSimulator::seeded(11));
        board.refresh();
        board
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let board = board();
        assert_eq!(board.quote("msft").map(|q| q.symbol.as_str()), Some("MSFT"));
        assert!(board.quote("NOTREAL").is_none());
        assert_eq!(board.price_of("AAPL"), board.prices().get("AAPL").copied());
    }

    #[test]
    fn test_sorting() {
        let board = board();
        let by_symbol = board.sorted(SortKey::Symbol, SortDirection::Asc);
        assert_eq!(by_symbol.first().unwrap().symbol, "AAPL");
        assert_eq!(by_symbol.last().unwrap().symbol, "XOM");

        let by_price = board.sorted(SortKey::Price, SortDirection::Desc);
        assert!(by_price.windows(2).all(|w| w[0].price >= w[1].price));
        assert_eq!(SortDirection::Desc.toggled(), SortDirection::Asc);
    }

    #[test]
    fn test_search_matches_sector_and_name() {
        let board = board();
        let energy = board.search("energy");
        assert_eq!(energy.len(), 1);
        assert_eq!(energy[0].symbol, "XOM");

        assert!(board.search("coca").iter().any(|q| q.symbol == "KO"));
        assert!(board.search("   ").is_empty());
    }

    #[test]
    fn test_movers_are_ordered() {
        let board = board();
        let top = board.top_movers(3);
        let bottom = board.bottom_movers(3);
        assert_eq!(top.len(), 3);
        assert_eq!(bottom.len(), 3);
        assert!(top[0].change_percent >= top[2].change_percent);
        assert!(bottom[0].change_percent <= bottom[2].change_percent);
        assert!(top[2].change_percent >= bottom[2].change_percent);
        assert!(board.top_movers(100).len() <= board.quotes().len());
        assert!(top.iter().all(|q| q.price >= dec!(0.01)));
    }
}

//! Watchlist
//!
//! Symbols the user tracks without holding them. Kept in the order they were added.

use serde::{Deserialize, Serialize};

use crate::model::normalize_symbol;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist(Vec<String>);

impl Watchlist {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns `false` when the symbol was already tracked
    pub fn add(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        if self.0.contains(&symbol) {
            return false;
        }
        self.0.push(symbol);
        true
    }

    /// Returns `false` when the symbol was not tracked
    pub fn remove(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let before = self.0.len();
        self.0.retain(|s| *s != symbol);
        self.0.len() != before
    }

    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        self.0.iter().any(|s| *s == symbol)
    }

    pub fn symbols(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut list = Watchlist::new();
        assert!(list.add("NVDA"));
        assert!(!list.add("nvda"));
        assert_eq!(list.len(), 1);
        assert!(list.contains("NVDA"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut list = Watchlist::new();
        list.add("KO");
        assert!(!list.remove("PG"));
        assert_eq!(list.symbols(), ["KO".to_string()]);
        assert!(list.remove("KO"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut list = Watchlist::new();
        for s in ["XOM", "AAPL", "DIS"] {
            list.add(s);
        }
        assert_eq!(list.symbols(), ["XOM", "AAPL", "DIS"].map(String::from));
    }
}

//! Listed Companies
//!
//! The fixed universe the simulated market quotes.

use crate::model::CatalogEntry;

const fn entry(symbol: &'static str, company_name: &'static str, sector: &'static str) -> CatalogEntry {
    CatalogEntry { symbol, company_name, sector }
}

pub const DEFAULT_CATALOG: &[CatalogEntry] = &[
    entry("AAPL", "Apple Inc.", "Technology"),
    entry("MSFT", "Microsoft Corporation", "Technology"),
    entry("AMZN", "Amazon.com Inc.", "Consumer Cyclical"),
    entry("GOOGL", "Alphabet Inc.", "Communication Services"),
    entry("META", "Meta Platforms Inc.", "Communication Services"),
    entry("TSLA", "Tesla Inc.", "Consumer Cyclical"),
    entry("NVDA", "NVIDIA Corporation", "Technology"),
    entry("JPM", "JPMorgan Chase & Co.", "Financial Services"),
    entry("JNJ", "Johnson & Johnson", "Healthcare"),
    entry("V", "Visa Inc.", "Financial Services"),
    entry("UNH", "UnitedHealth Group Inc.", "Healthcare"),
    entry("HD", "The Home Depot Inc.", "Consumer Cyclical"),
    entry("PG", "Procter & Gamble Co.", "Consumer Defensive"),
    entry("BAC", "Bank of America Corp.", "Financial Services"),
    entry("XOM", "Exxon Mobil Corporation", "Energy"),
    entry("DIS", "The Walt Disney Company", "Communication Services"),
    entry("VZ", "Verizon Communications Inc.", "Communication Services"),
    entry("CSCO", "Cisco Systems Inc.", "Technology"),
    entry("KO", "The Coca-Cola Company", "Consumer Defensive"),
    entry("ADBE", "Adobe Inc.", "Technology"),
];

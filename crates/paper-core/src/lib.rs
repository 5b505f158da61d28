//! # paper-core
//!
//! Paper-trading account simulator: a synthetic stock market, a cash-and-positions
//! ledger, and a per-identity account store with debounced persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        AccountStore                          │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ AccountState │──▶│    Ledger    │   │  AccountStorage  │  │
//! │  │  (in memory) │   │  buy / sell  │   │  (debounced save)│  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! └───────────────▲──────────────────────────────────────────────┘
//!                 │ quotes (QuoteSource)
//!        ┌────────┴────────┐
//!        │   MarketBoard   │◀── PriceSimulator (random walk)
//!        └─────────────────┘
//! ```
//!
//! The ledger is pure: it takes a quote's price as an argument and never asks
//! the simulator. All money is [`rust_decimal::Decimal`].

pub mod config;
pub mod error;
pub mod format;
pub mod ledger;
pub mod market;
pub mod model;
pub mod profile;
pub mod snapshot;
pub mod store;
pub mod watchlist;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use ledger::{max_affordable, parse_quantity, Holding, Ledger, PnlSummary};
pub use market::{MarketBoard, PriceSimulator, QuoteSource, DEFAULT_CATALOG};
pub use model::{AccountState, Execution, Position, Quote, TradeSide, Transaction, UserId};
pub use profile::{InvestorProfile, ProfileUpdate};
pub use snapshot::AdvisorSnapshot;
pub use store::{AccountStorage, AccountStore, JsonFileStorage, MemoryAccountStorage, PersistMarker, StoreConfig};
pub use watchlist::Watchlist;

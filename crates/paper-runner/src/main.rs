//! paper-runner
//!
//! Headless paper-trading session. Loads the configured account, refreshes the
//! simulated market on a fixed interval, and saves on shutdown.

mod session;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paper_core::{
    AccountStorage, AccountStore, JsonFileStorage, MarketBoard, PriceSimulator, SimConfig, StoreConfig, UserId,
};

use crate::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = SimConfig::from_env()?;

    let storage: Arc<dyn AccountStorage> = Arc::new(JsonFileStorage::new(&config.data_dir));
    let mut store = AccountStore::new(storage, StoreConfig::from(&config));

    match &config.user {
        Some(user) => store.login(UserId::new(user.trim())).await,
        None => tracing::warn!("PAPER_USER not set - changes will not be saved"),
    }

    let board = MarketBoard::new(PriceSimulator::from_seed(config.seed));
    tracing::info!(
        stocks = board.quotes().len(),
        data_dir = %config.data_dir.display(),
        tick_secs = config.tick_interval.as_secs(),
        "market open"
    );

    let mut session = Session::new(board, store);
    session.log_snapshot();

    let mut ticker = tokio::time::interval(config.tick_interval);
    // The first tick fires immediately; the opening board is already fresh
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => session.tick(),
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
        }
    }

    tracing::info!("shutting down");
    session.log_snapshot();
    session.store.shutdown().await;

    Ok(())
}

//! Session loop: market ticks feeding the bound account

use paper_core::format::{format_currency, format_percentage};
use paper_core::{AccountStore, AdvisorSnapshot, Ledger, MarketBoard};

pub struct Session {
    pub board: MarketBoard,
    pub store: AccountStore,
}

impl Session {
    pub const fn new(board: MarketBoard, store: AccountStore) -> Self {
        Self { board, store }
    }

    /// Advance the market one step and revalue the account
    pub fn tick(&mut self) {
        self.board.refresh();
        let repriced = self.store.refresh_prices(&self.board);

        for mover in self.board.top_movers(1).iter().chain(&self.board.bottom_movers(1)) {
            tracing::info!(
                symbol = %mover.symbol,
                price = %format_currency(mover.price),
                change = %format_percentage(mover.change_percent),
                "mover"
            );
        }

        let state = self.store.state();
        let pnl = Ledger::unrealized_pnl(state, &self.board);
        tracing::info!(
            cash = %format_currency(state.balance),
            holdings = %format_currency(pnl.market_value),
            pnl = %format_percentage(pnl.percent),
            repriced,
            "account"
        );
    }

    /// Log the assistant context for the current account
    pub fn log_snapshot(&self) {
        let snapshot = AdvisorSnapshot::capture(self.store.state(), &self.board, None);
        tracing::debug!("\n{}", snapshot.to_prompt_context());
    }
}

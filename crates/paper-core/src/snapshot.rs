//! Advisor Snapshot
//!
//! Read-only summary of the account and market handed to the chat assistant.
//! The assistant lives outside this crate; it only ever sees this text.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::format::{format_currency, format_percentage};
use crate::ledger::{Holding, Ledger, PnlSummary};
use crate::market::MarketBoard;
use crate::model::{AccountState, Quote};
use crate::profile::InvestorProfile;

/// Movers shown in the market overview
const MOVERS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverLine {
    pub symbol: String,
    pub price: Decimal,
    pub change_percent: Decimal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSnapshot {
    pub cash: Decimal,
    pub portfolio: PnlSummary,
    pub holdings: Vec<Holding>,
    pub watchlist: Vec<String>,
    pub top_movers: Vec<MoverLine>,
    pub bottom_movers: Vec<MoverLine>,
    pub trade_count: usize,
    pub profile: Option<InvestorProfile>,
    pub captured_at: DateTime<Utc>,
}

impl AdvisorSnapshot {
    pub fn capture(state: &AccountState, board: &MarketBoard, profile: Option<&InvestorProfile>) -> Self {
        let mover = |q: &&Quote| MoverLine {
            symbol: q.symbol.clone(),
            price: q.price,
            change_percent: q.change_percent,
        };

        Self {
            cash: state.balance,
            portfolio: Ledger::unrealized_pnl(state, board),
            holdings: Ledger::holdings(state, board),
            watchlist: state.watchlist.symbols().to_vec(),
            top_movers: board.top_movers(MOVERS).iter().map(mover).collect(),
            bottom_movers: board.bottom_movers(MOVERS).iter().map(mover).collect(),
            trade_count: state.transactions.len(),
            profile: profile.cloned(),
            captured_at: Utc::now(),
        }
    }

    /// Cash plus market value of positions
    pub fn net_worth(&self) -> Decimal {
        self.cash + self.portfolio.market_value
    }

    /// Plain-text context block for the assistant's prompt
    pub fn to_prompt_context(&self) -> String {
        let mut out = String::from("Paper Account\n");
        out.push_str("═".repeat(50).as_str());
        out.push('\n');

        let _ = writeln!(out, "Cash:            {}", format_currency(self.cash));
        let _ = writeln!(out, "Portfolio value: {}", format_currency(self.portfolio.market_value));
        let _ = writeln!(out, "Net worth:       {}", format_currency(self.net_worth()));
        let _ = writeln!(
            out,
            "Unrealized P&L:  {} ({})",
            format_currency(self.portfolio.amount),
            format_percentage(self.portfolio.percent)
        );
        let _ = writeln!(out, "Trades made:     {}", self.trade_count);

        if self.holdings.is_empty() {
            out.push_str("\nNo open positions.\n");
        } else {
            out.push_str("\nHoldings:\n");
            for h in &self.holdings {
                let _ = writeln!(
                    out,
                    "  {:<6} {:>5} @ avg {} now {} ({})",
                    h.symbol,
                    h.quantity,
                    format_currency(h.average_price),
                    format_currency(h.current_price),
                    format_percentage(h.pnl.percent)
                );
            }
        }

        if !self.watchlist.is_empty() {
            let _ = writeln!(out, "\nWatchlist: {}", self.watchlist.join(", "));
        }

        out.push_str("\nMarket movers:\n");
        for line in self.top_movers.iter().chain(&self.bottom_movers) {
            let _ = writeln!(
                out,
                "  {:<6} {} ({})",
                line.symbol,
                format_currency(line.price),
                format_percentage(line.change_percent)
            );
        }

        if let Some(profile) = &self.profile {
            out.push_str("\nInvestor profile:\n");
            let _ = writeln!(out, "  Risk tolerance: {}", profile.risk_tolerance.as_str());
            let _ = writeln!(out, "  Horizon:        {}", profile.investment_horizon.as_str());
            if !profile.investment_goals.is_empty() {
                let _ = writeln!(out, "  Goals:          {}", profile.investment_goals);
            }
            if !profile.interests.is_empty() {
                let _ = writeln!(out, "  Interests:      {}", profile.interests.join(", "));
            }
        }

        out
    }
}

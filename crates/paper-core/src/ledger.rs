//! Ledger
//!
//! Buy/sell rules over one [`AccountState`]. The ledger keeps no state of its
//! own and never looks prices up itself: execution prices are arguments and
//! valuations read through a [`QuoteSource`].
//!
//! Every rejection happens before the first write, so a failed trade leaves
//! the account exactly as it was.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::market::QuoteSource;
use crate::model::{normalize_symbol, AccountState, Execution, Position, TradeSide, Transaction};

pub struct Ledger;

impl Ledger {
    /// Buy `quantity` shares at `unit_price`, debiting cash
    pub fn buy(
        state: &mut AccountState,
        symbol: &str,
        company_name: &str,
        quantity: u64,
        unit_price: Decimal,
    ) -> Result<Execution> {
        validate_order(quantity, unit_price)?;
        let symbol = normalize_symbol(symbol);
        let total = order_total(quantity, unit_price)?;

        if total > state.balance {
            return Err(SimError::InsufficientFunds {
                needed: total,
                available: state.balance,
            });
        }

        // Work out the merged position before touching anything
        let merged = match state.positions.get(&symbol) {
            Some(pos) => {
                let quantity = pos.quantity.checked_add(quantity).ok_or_else(too_large)?;
                let total_cost = pos.total_cost.checked_add(total).ok_or_else(too_large)?;
                Position {
                    quantity,
                    total_cost,
                    average_price: total_cost / Decimal::from(quantity),
                    last_price: unit_price,
                    ..pos.clone()
                }
            }
            None => Position::open(symbol.clone(), company_name, quantity, unit_price),
        };

        state.balance -= total;
        state.positions.insert(symbol.clone(), merged);

        let transaction = Transaction::new(TradeSide::Buy, symbol, company_name, quantity, unit_price);
        state.transactions.push(transaction.clone());

        tracing::debug!(
            symbol = %transaction.symbol,
            quantity,
            price = %unit_price,
            balance = %state.balance,
            "buy executed"
        );

        Ok(Execution {
            transaction,
            realized_pnl: Decimal::ZERO,
            balance_after: state.balance,
        })
    }

    /// Sell `quantity` held shares at `unit_price`, crediting cash
    ///
    /// Partial sells keep the average price; the position closes when the
    /// last share is sold.
    pub fn sell(
        state: &mut AccountState,
        symbol: &str,
        quantity: u64,
        unit_price: Decimal,
    ) -> Result<Execution> {
        validate_order(quantity, unit_price)?;
        let symbol = normalize_symbol(symbol);

        let position = state
            .positions
            .get_mut(&symbol)
            .ok_or_else(|| SimError::NoPosition(symbol.clone()))?;

        if quantity > position.quantity {
            return Err(SimError::InsufficientShares {
                symbol,
                requested: quantity,
                held: position.quantity,
            });
        }

        let total = order_total(quantity, unit_price)?;
        let balance_after = state.balance.checked_add(total).ok_or_else(too_large)?;
        let realized_pnl = (unit_price - position.average_price)
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(too_large)?;
        let company_name = position.company_name.clone();

        if quantity == position.quantity {
            state.positions.remove(&symbol);
        } else {
            position.quantity -= quantity;
            position.total_cost = position.average_price * Decimal::from(position.quantity);
            position.last_price = unit_price;
        }

        let transaction = Transaction::new(TradeSide::Sell, symbol, company_name, quantity, unit_price);
        state.balance = balance_after;
        state.transactions.push(transaction.clone());

        tracing::debug!(
            symbol = %transaction.symbol,
            quantity,
            price = %unit_price,
            realized = %realized_pnl,
            balance = %state.balance,
            "sell executed"
        );

        Ok(Execution {
            transaction,
            realized_pnl,
            balance_after: state.balance,
        })
    }

    /// Market value of all positions; symbols missing from `quotes` use the
    /// position's last known price
    pub fn portfolio_value<Q: QuoteSource + ?Sized>(state: &AccountState, quotes: &Q) -> Decimal {
        state
            .positions
            .values()
            .map(|p| p.market_value(current_price(p, quotes)))
            .sum()
    }

    /// Unrealized P&L across all positions
    pub fn unrealized_pnl<Q: QuoteSource + ?Sized>(state: &AccountState, quotes: &Q) -> PnlSummary {
        let market_value = Self::portfolio_value(state, quotes);
        let cost_basis = state.total_cost_basis();
        PnlSummary::new(market_value, cost_basis)
    }

    /// One valuation row per position, ordered by symbol
    pub fn holdings<Q: QuoteSource + ?Sized>(state: &AccountState, quotes: &Q) -> Vec<Holding> {
        state
            .positions
            .values()
            .map(|p| {
                let price = current_price(p, quotes);
                Holding {
                    symbol: p.symbol.clone(),
                    company_name: p.company_name.clone(),
                    quantity: p.quantity,
                    average_price: p.average_price,
                    current_price: price,
                    pnl: PnlSummary::new(p.market_value(price), p.total_cost),
                }
            })
            .collect()
    }

    /// Remember the latest quoted price on every held position
    ///
    /// Returns how many positions saw a different price.
    pub fn mark_to_market<Q: QuoteSource + ?Sized>(state: &mut AccountState, quotes: &Q) -> usize {
        let mut updated = 0;
        for position in state.positions.values_mut() {
            match quotes.price_of(&position.symbol) {
                Some(price) if price != position.last_price => {
                    position.last_price = price;
                    updated += 1;
                }
                _ => {}
            }
        }
        updated
    }
}

fn current_price<Q: QuoteSource + ?Sized>(position: &Position, quotes: &Q) -> Decimal {
    quotes.price_of(&position.symbol).unwrap_or(position.last_price)
}

/// `unit_price * quantity`, rejected when it does not fit in a `Decimal`
fn order_total(quantity: u64, unit_price: Decimal) -> Result<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity)).ok_or_else(too_large)
}

fn too_large() -> SimError {
    SimError::InvalidQuantity("order value is too large".into())
}

fn validate_order(quantity: u64, unit_price: Decimal) -> Result<()> {
    if quantity == 0 {
        return Err(SimError::InvalidQuantity("quantity must be at least 1".into()));
    }
    if unit_price <= Decimal::ZERO {
        return Err(SimError::InvalidPrice(unit_price));
    }
    Ok(())
}

/// Market value against cost, with the percentage relative to cost
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlSummary {
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub amount: Decimal,
    /// Zero when nothing is invested
    pub percent: Decimal,
}

impl PnlSummary {
    pub fn new(market_value: Decimal, cost_basis: Decimal) -> Self {
        let amount = market_value - cost_basis;
        let percent = if cost_basis > Decimal::ZERO {
            amount / cost_basis * dec!(100)
        } else {
            Decimal::ZERO
        };
        Self { market_value, cost_basis, amount, percent }
    }
}

/// Portfolio screen row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub company_name: String,
    pub quantity: u64,
    pub average_price: Decimal,
    pub current_price: Decimal,
    pub pnl: PnlSummary,
}

/// Parse the share count typed into the trade form
///
/// Only whole positive numbers are accepted; "2.5" is rejected rather than
/// truncated.
pub fn parse_quantity(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SimError::InvalidQuantity("enter a quantity".into()));
    }
    let quantity: u64 = trimmed
        .parse()
        .map_err(|_| SimError::InvalidQuantity(format!("'{trimmed}' is not a whole number of shares")))?;
    if quantity == 0 {
        return Err(SimError::InvalidQuantity("quantity must be at least 1".into()));
    }
    Ok(quantity)
}

/// Whole shares the balance can pay for at `unit_price`
pub fn max_affordable(balance: Decimal, unit_price: Decimal) -> u64 {
    if unit_price <= Decimal::ZERO || balance <= Decimal::ZERO {
        return 0;
    }
    (balance / unit_price).trunc().to_u64().unwrap_or(0)
}

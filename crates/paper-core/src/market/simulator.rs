//! Price Simulator
//!
//! Random-walk quote generation. Every draw comes from one `StdRng`, so a
//! seeded simulator replays the same market.

use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::{round_money, CatalogEntry, PricePoint, Quote};

/// Smallest price a quote can fall to
pub const PRICE_FLOOR: Decimal = dec!(0.01);

/// Smallest volume a quote can fall to
pub const VOLUME_FLOOR: u64 = 1_000;

/// Largest absolute move per tick (3%)
const MAX_DAILY_MOVE: f64 = 0.03;

/// Largest absolute volume perturbation per tick (10%)
const MAX_VOLUME_MOVE: f64 = 0.10;

pub struct PriceSimulator {
    rng: StdRng,
}

impl Default for PriceSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSimulator {
    /// Simulator seeded from OS entropy
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Deterministic simulator for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::seeded)
    }

    /// Price every catalog entry for the first time
    pub fn initialize_universe(&mut self, catalog: &[CatalogEntry]) -> Vec<Quote> {
        catalog
            .iter()
            .map(|entry| {
                let price = round_money(to_decimal(self.rng.gen_range(50.0..1050.0)));
                let volume = self.rng.gen_range(1_000_000..11_000_000);
                let market_cap = self.rng.gen_range(50_000_000_000..2_050_000_000_000);
                Quote::new(entry, price.max(PRICE_FLOOR), volume, market_cap)
            })
            .collect()
    }

    /// Advance every quote by one random step, returning the new quotes
    pub fn tick(&mut self, quotes: &[Quote]) -> Vec<Quote> {
        quotes.iter().map(|q| self.step(q)).collect()
    }

    fn step(&mut self, quote: &Quote) -> Quote {
        let drawn = to_decimal(self.rng.gen_range(-MAX_DAILY_MOVE..=MAX_DAILY_MOVE));
        let previous_close = quote.price;
        let price = round_money(previous_close + previous_close * drawn).max(PRICE_FLOOR);
        let change = price - previous_close;
        let change_percent = if previous_close > Decimal::ZERO {
            round_money(change / previous_close * dec!(100))
        } else {
            Decimal::ZERO
        };

        let volume_move = self.rng.gen_range(-MAX_VOLUME_MOVE..=MAX_VOLUME_MOVE);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let volume = ((quote.volume as f64) * (1.0 + volume_move)).floor() as u64;

        Quote {
            price,
            previous_close,
            change,
            change_percent,
            volume: volume.max(VOLUME_FLOOR),
            ..quote.clone()
        }
    }

    /// Chart series of `days + 1` daily points ending today
    pub fn generate_history(&mut self, days: i64, base_price: Decimal) -> Vec<PricePoint> {
        self.generate_history_until(Utc::now().date_naive(), days, base_price)
    }

    /// Chart series of `days + 1` daily points ending at `today`
    ///
    /// Negative `days` yields an empty series. The series never reaches back
    /// past the earliest representable date.
    pub fn generate_history_until(
        &mut self,
        today: NaiveDate,
        days: i64,
        base_price: Decimal,
    ) -> Vec<PricePoint> {
        if days < 0 {
            return Vec::new();
        }
        let days = days.min((today - NaiveDate::MIN).num_days());

        let mut current = base_price;
        (0..=days)
            .rev()
            .map(|ago| {
                let daily = to_decimal(self.rng.gen_range(-MAX_DAILY_MOVE..=MAX_DAILY_MOVE));
                current = (current * (Decimal::ONE + daily)).max(PRICE_FLOOR);
                PricePoint {
                    date: today - Duration::days(ago),
                    value: round_money(current),
                }
            })
            .collect()
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

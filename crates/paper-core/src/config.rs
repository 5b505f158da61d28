//! Configuration
//!
//! Settings read from the environment (a `.env` file is loaded by the binary).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{Result, SimError};
use crate::model::DEFAULT_STARTING_BALANCE;

#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Cash a fresh account starts with
    pub starting_balance: Decimal,

    /// How often the market refreshes
    pub tick_interval: Duration,

    /// Quiet period before a save is written
    pub save_debounce: Duration,

    /// Extra attempts after a failed save
    pub save_retries: u32,

    /// Directory holding one JSON file per account
    pub data_dir: PathBuf,

    /// Fixed simulator seed; entropy when unset
    pub seed: Option<u64>,

    /// Identity to bind at startup
    pub user: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            tick_interval: Duration::from_secs(10),
            save_debounce: Duration::from_millis(500),
            save_retries: 2,
            data_dir: PathBuf::from("./data"),
            seed: None,
            user: None,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let starting_balance: Decimal =
            parse_var(&lookup, "PAPER_STARTING_BALANCE")?.unwrap_or(defaults.starting_balance);
        if starting_balance < Decimal::ZERO {
            return Err(SimError::Config("PAPER_STARTING_BALANCE must not be negative".into()));
        }

        let tick_interval = parse_var(&lookup, "PAPER_TICK_INTERVAL_SECS")?
            .map_or(defaults.tick_interval, Duration::from_secs);
        if tick_interval.is_zero() {
            return Err(SimError::Config("PAPER_TICK_INTERVAL_SECS must be at least 1".into()));
        }

        Ok(Self {
            starting_balance,
            tick_interval,
            save_debounce: parse_var(&lookup, "PAPER_SAVE_DEBOUNCE_MS")?
                .map_or(defaults.save_debounce, Duration::from_millis),
            save_retries: parse_var(&lookup, "PAPER_SAVE_RETRIES")?.unwrap_or(defaults.save_retries),
            data_dir: lookup("PAPER_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            seed: parse_var(&lookup, "PAPER_SEED")?,
            user: lookup("PAPER_USER").filter(|u| !u.trim().is_empty()),
        })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| SimError::Config(format!("{key} has an invalid value: '{raw}'")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = SimConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.starting_balance, dec!(10000));
        assert_eq!(config.tick_interval, Duration::from_secs(10));
        assert_eq!(config.save_debounce, Duration::from_millis(500));
        assert!(config.seed.is_none());
        assert!(config.user.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = SimConfig::from_lookup(lookup(&[
            ("PAPER_STARTING_BALANCE", "2500.50"),
            ("PAPER_TICK_INTERVAL_SECS", "3"),
            ("PAPER_SEED", "42"),
            ("PAPER_USER", "alice"),
            ("PAPER_DATA_DIR", "/tmp/paper"),
        ]))
        .unwrap();
        assert_eq!(config.starting_balance, dec!(2500.50));
        assert_eq!(config.tick_interval, Duration::from_secs(3));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/paper"));
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(matches!(
            SimConfig::from_lookup(lookup(&[("PAPER_SAVE_RETRIES", "many")])),
            Err(SimError::Config(_))
        ));
        assert!(SimConfig::from_lookup(lookup(&[("PAPER_STARTING_BALANCE", "-1")])).is_err());
        assert!(SimConfig::from_lookup(lookup(&[("PAPER_TICK_INTERVAL_SECS", "0")])).is_err());
    }
}

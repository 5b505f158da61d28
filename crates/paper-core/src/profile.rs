//! Investor Profile
//!
//! What the user told onboarding about themselves. Only enumerated values are
//! kept for risk tolerance and horizon; anything else falls back to `Medium`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::DEFAULT_STARTING_BALANCE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    /// Unknown input maps to `Medium`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl<'de> Deserialize<'de> for RiskTolerance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or_else(Self::default, |s| Self::parse(&s)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentHorizon {
    Short,
    #[default]
    Medium,
    Long,
}

impl InvestmentHorizon {
    /// Unknown input maps to `Medium`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl<'de> Deserialize<'de> for InvestmentHorizon {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or_else(Self::default, |s| Self::parse(&s)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorProfile {
    pub name: String,

    pub email: String,

    #[serde(default)]
    pub investment_goals: String,

    #[serde(default)]
    pub risk_tolerance: RiskTolerance,

    #[serde(default)]
    pub investment_horizon: InvestmentHorizon,

    #[serde(default)]
    pub interests: Vec<String>,

    /// Set once from the starting balance; updates never change it
    #[serde(default = "default_portfolio_value")]
    pub portfolio_value: Decimal,

    #[serde(default)]
    pub preferred_investments: String,
}

const fn default_portfolio_value() -> Decimal {
    DEFAULT_STARTING_BALANCE
}

impl Default for InvestorProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            investment_goals: String::new(),
            risk_tolerance: RiskTolerance::default(),
            investment_horizon: InvestmentHorizon::default(),
            interests: Vec::new(),
            portfolio_value: DEFAULT_STARTING_BALANCE,
            preferred_investments: String::new(),
        }
    }
}

impl InvestorProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Merge a partial update
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(goals) = update.investment_goals {
            self.investment_goals = goals;
        }
        if let Some(risk) = update.risk_tolerance {
            self.risk_tolerance = risk;
        }
        if let Some(horizon) = update.investment_horizon {
            self.investment_horizon = horizon;
        }
        if let Some(interests) = update.interests {
            self.interests = interests;
        }
        if let Some(preferred) = update.preferred_investments {
            self.preferred_investments = preferred;
        }
    }
}

/// Partial profile edit; absent fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub investment_goals: Option<String>,
    pub risk_tolerance: Option<RiskTolerance>,
    pub investment_horizon: Option<InvestmentHorizon>,
    pub interests: Option<Vec<String>>,
    pub preferred_investments: Option<String>,
}

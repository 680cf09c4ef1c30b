//! Shared types for the Greeks kernel

use crate::error::GreeksError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Option type (Call or Put)
///
/// Rendered with the exchange tags `CE` / `PE`; `CALL` / `PUT` are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE", alias = "CALL", alias = "Call", alias = "call")]
    Call,
    #[serde(rename = "PE", alias = "PUT", alias = "Put", alias = "put")]
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "CE",
            OptionType::Put => "PE",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = GreeksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CE" | "CALL" | "C" => Ok(OptionType::Call),
            "PE" | "PUT" | "P" => Ok(OptionType::Put),
            _ => Err(GreeksError::InvalidOptionType(s.to_string())),
        }
    }
}

/// Market parameters for one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionQuoteInput {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in calendar days
    #[serde(rename = "timeToExpiry")]
    pub time_to_expiry_days: f64,
    /// Annual risk-free rate as a decimal; missing or zero means the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_free_rate: Option<f64>,
    /// Volatility as a decimal (0.15 = 15%)
    pub volatility: f64,
    /// Call or put
    pub option_type: OptionType,
}

impl OptionQuoteInput {
    pub fn new(
        spot: f64,
        strike: f64,
        time_to_expiry_days: f64,
        volatility: f64,
        option_type: OptionType,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry_days,
            risk_free_rate: None,
            volatility,
            option_type,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    /// True when the inputs have no physical meaning for the closed form
    pub fn is_degenerate(&self) -> bool {
        !is_positive(self.time_to_expiry_days)
            || !is_positive(self.volatility)
            || !is_positive(self.spot)
            || !is_positive(self.strike)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Option Greeks for one contract, rounded for presentation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreeksResult {
    /// Delta: ∂V/∂S
    pub delta: f64,
    /// Gamma: ∂²V/∂S²
    pub gamma: f64,
    /// Theta: daily time decay
    pub theta: f64,
    /// Vega: value change per 1 vol point
    pub vega: f64,
    /// Rho: value change per 1 rate point
    pub rho: f64,
    /// Volatility used, in percent; degenerate quotes echo the input volatility unchanged
    pub implied_volatility_percent: f64,
}

impl GreeksResult {
    /// Zero sensitivities, echoing the volatility as given when it is positive
    pub fn degenerate(volatility: f64) -> Self {
        let iv = if is_positive(volatility) { volatility } else { 0.0 };

        Self {
            implied_volatility_percent: iv,
            ..Self::default()
        }
    }

    /// True when every sensitivity is zero
    pub fn is_flat(&self) -> bool {
        self.delta == 0.0
            && self.gamma == 0.0
            && self.theta == 0.0
            && self.vega == 0.0
            && self.rho == 0.0
    }

    /// Apply the presentation rounding policy
    pub fn rounded(self) -> Self {
        Self {
            delta: round_to(self.delta, 4),
            gamma: round_to(self.gamma, 6),
            theta: round_to(self.theta, 4),
            vega: round_to(self.vega, 4),
            rho: round_to(self.rho, 4),
            implied_volatility_percent: round_to(self.implied_volatility_percent, 2),
        }
    }
}

/// One strike in a batch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub strike: f64,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Implied volatility in percent (15.0 = 15%)
    #[serde(rename = "iv")]
    pub implied_volatility_percent: f64,
    pub days_to_expiry: f64,
}

/// Batch input identity plus its Greeks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultItem {
    #[serde(flatten)]
    pub item: BatchItem,
    #[serde(flatten)]
    pub greeks: GreeksResult,
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

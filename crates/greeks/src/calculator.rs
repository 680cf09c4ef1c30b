//! Black-Scholes-Merton Greeks for a single contract

use crate::normal::{norm_cdf, norm_pdf};
use crate::types::{GreeksResult, OptionQuoteInput, OptionType};
use tracing::trace;

/// Risk-free rate used when the caller supplies none
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;
/// Calendar days per year for the expiry year fraction
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Closed-form Greeks calculator.
///
/// Holds only the defaults needed to resolve a quote; calculation itself is
/// pure and the calculator is freely copied into background workers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsmCalculator {
    default_rate: f64,
    days_per_year: f64,
}

impl Default for BsmCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_FREE_RATE)
    }
}

impl BsmCalculator {
    pub fn new(default_rate: f64) -> Self {
        Self {
            default_rate,
            days_per_year: DAYS_PER_YEAR,
        }
    }

    pub fn with_days_per_year(mut self, days_per_year: f64) -> Self {
        self.days_per_year = days_per_year;
        self
    }

    pub fn default_rate(&self) -> f64 {
        self.default_rate
    }

    pub fn days_per_year(&self) -> f64 {
        self.days_per_year
    }

    /// Missing, zero or NaN rates fall back to the configured default.
    pub fn resolve_rate(&self, rate: Option<f64>) -> f64 {
        match rate {
            Some(r) if r != 0.0 && !r.is_nan() => r,
            _ => self.default_rate,
        }
    }

    /// Full Greeks for one contract
    pub fn calculate(&self, input: &OptionQuoteInput) -> GreeksResult {
        if input.is_degenerate() {
            trace!(?input, "Degenerate quote, returning zero greeks");
            return GreeksResult::degenerate(input.volatility);
        }

        let p = self.params(input);
        let (d1, d2) = p.d1_d2();
        let pdf = norm_pdf(d1);
        let discounted_strike = p.k * (-p.r * p.t).exp();

        let delta = match input.option_type {
            OptionType::Call => norm_cdf(d1),
            OptionType::Put => norm_cdf(d1) - 1.0,
        };

        let gamma = pdf / (p.s * p.v * p.sqrt_t);

        let decay = -(p.s * pdf * p.v) / (2.0 * p.sqrt_t);
        let theta_annual = match input.option_type {
            OptionType::Call => decay - p.r * discounted_strike * norm_cdf(d2),
            OptionType::Put => decay + p.r * discounted_strike * norm_cdf(-d2),
        };

        let vega = p.s * p.sqrt_t * pdf * 0.01;

        let rho = match input.option_type {
            OptionType::Call => p.t * discounted_strike * norm_cdf(d2) * 0.01,
            OptionType::Put => -p.t * discounted_strike * norm_cdf(-d2) * 0.01,
        };

        GreeksResult {
            delta,
            gamma,
            theta: theta_annual / self.days_per_year,
            vega,
            rho,
            implied_volatility_percent: p.v * 100.0,
        }
        .rounded()
    }

    /// Delta only, with the remaining sensitivities left at zero.
    ///
    /// Used by the reduced-fidelity single-contract fallback.
    pub fn delta_only(&self, input: &OptionQuoteInput) -> GreeksResult {
        if input.is_degenerate() {
            return GreeksResult::degenerate(input.volatility);
        }

        let (d1, _) = self.params(input).d1_d2();
        let delta = match input.option_type {
            OptionType::Call => norm_cdf(d1),
            OptionType::Put => norm_cdf(d1) - 1.0,
        };

        GreeksResult {
            delta,
            implied_volatility_percent: input.volatility * 100.0,
            ..GreeksResult::default()
        }
        .rounded()
    }

    fn params(&self, input: &OptionQuoteInput) -> Params {
        let t = input.time_to_expiry_days / self.days_per_year;
        Params {
            s: input.spot,
            k: input.strike,
            t,
            sqrt_t: t.sqrt(),
            v: input.volatility,
            r: self.resolve_rate(input.risk_free_rate),
        }
    }
}

struct Params {
    s: f64,
    k: f64,
    t: f64,
    sqrt_t: f64,
    v: f64,
    r: f64,
}

impl Params {
    fn d1_d2(&self) -> (f64, f64) {
        let vol_sqrt_t = self.v * self.sqrt_t;
        let d1 = ((self.s / self.k).ln() + (self.r + 0.5 * self.v * self.v) * self.t) / vol_sqrt_t;
        (d1, d1 - vol_sqrt_t)
    }
}

/// Greeks with the default rate and a 365-day year
pub fn calculate_greeks(input: &OptionQuoteInput) -> GreeksResult {
    BsmCalculator::default().calculate(input)
}

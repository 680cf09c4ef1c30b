//! Greeks kernel for GreekX
//!
//! This crate provides the closed-form Black-Scholes-Merton sensitivities
//! for vanilla European calls and puts.
//!
//! # Core Components
//!
//! - [`normal`] - Standard normal CDF and PDF
//! - [`calculator`] - Single-contract Greeks (delta, gamma, theta, vega, rho)
//! - [`batch`] - Order-preserving Greeks over a strike list sharing spot and rate
//! - [`types`] - Inputs, results and batch items
//!
//! # Key Invariants
//!
//! - Non-physical inputs (expired, zero vol, zero spot or strike) return zero
//!   Greeks rather than an error
//! - Results are rounded for presentation: delta/theta/vega/rho to 4 places,
//!   gamma to 6, implied volatility to 2
//! - Batch output is 1:1 with batch input, in input order

pub mod batch;
pub mod calculator;
pub mod error;
pub mod normal;
pub mod types;

pub use batch::BatchGreeksProcessor;
pub use calculator::{calculate_greeks, BsmCalculator, DAYS_PER_YEAR, DEFAULT_RISK_FREE_RATE};
pub use error::GreeksError;
pub use types::{BatchItem, BatchResultItem, GreeksResult, OptionQuoteInput, OptionType};

pub type Result<T> = std::result::Result<T, GreeksError>;

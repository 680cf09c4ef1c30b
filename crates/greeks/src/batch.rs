//! Greeks across a strike list sharing spot and rate

use crate::calculator::BsmCalculator;
use crate::types::{BatchItem, BatchResultItem, OptionQuoteInput};
use tracing::debug;

/// Applies the calculator to every item of a batch.
///
/// Output is 1:1 with the input and in input order. Malformed items get the
/// same zero-result treatment as a single degenerate quote; nothing aborts
/// the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchGreeksProcessor {
    calculator: BsmCalculator,
}

impl BatchGreeksProcessor {
    pub fn new(calculator: BsmCalculator) -> Self {
        Self { calculator }
    }

    pub fn calculator(&self) -> &BsmCalculator {
        &self.calculator
    }

    pub fn process(
        &self,
        spot: f64,
        risk_free_rate: Option<f64>,
        items: &[BatchItem],
    ) -> Vec<BatchResultItem> {
        let rate = self.calculator.resolve_rate(risk_free_rate);

        let results: Vec<BatchResultItem> = items
            .iter()
            .map(|item| {
                let input = OptionQuoteInput {
                    spot,
                    strike: item.strike,
                    time_to_expiry_days: item.days_to_expiry,
                    risk_free_rate: Some(rate),
                    volatility: item.implied_volatility_percent / 100.0,
                    option_type: item.option_type,
                };

                BatchResultItem {
                    item: item.clone(),
                    greeks: self.calculator.calculate(&input),
                }
            })
            .collect();

        debug!(spot, rate, count = results.len(), "Processed greeks batch");
        results
    }
}

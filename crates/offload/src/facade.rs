//! Call-site API for greeks calculations
//!
//! Every call tries the background worker first. Any failure on that path
//! (worker unavailable, timeout, remote error, unreadable payload) is logged
//! and answered in-process instead, so callers always get a result.

use crate::channel::{OffloadChannel, OffloadSettings, OffloadTransport};
use crate::error::OffloadError;
use crate::protocol::{BatchRequest, Message};
use crate::stats::record_fallback;
use greeks::{BatchGreeksProcessor, BatchItem, BatchResultItem, BsmCalculator, GreeksResult, OptionQuoteInput};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the single-option fallback computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleFallback {
    /// Delta only; the other greeks are zero
    #[default]
    DeltaOnly,
    /// Full calculation, identical to the offloaded result
    Full,
}

impl From<config::SingleFallbackFidelity> for SingleFallback {
    fn from(fidelity: config::SingleFallbackFidelity) -> Self {
        match fidelity {
            config::SingleFallbackFidelity::DeltaOnly => Self::DeltaOnly,
            config::SingleFallbackFidelity::Full => Self::Full,
        }
    }
}

pub struct ClientFacade {
    transport: Arc<dyn OffloadTransport>,
    processor: BatchGreeksProcessor,
    single_fallback: SingleFallback,
}

impl ClientFacade {
    pub fn new(transport: Arc<dyn OffloadTransport>, calculator: BsmCalculator) -> Self {
        Self {
            transport,
            processor: BatchGreeksProcessor::new(calculator),
            single_fallback: SingleFallback::default(),
        }
    }

    pub fn with_single_fallback(mut self, single_fallback: SingleFallback) -> Self {
        self.single_fallback = single_fallback;
        self
    }

    /// Facade over the process-wide channel with default pricing settings
    pub fn shared() -> Self {
        Self::new(OffloadChannel::shared(), BsmCalculator::default())
    }

    /// Install a channel built from `config` as the process-wide channel and
    /// return a facade over it.
    ///
    /// When a channel is already installed, that one is reused together with
    /// its pricing defaults, so the fallback prices exactly like the worker.
    pub fn from_config(config: &config::GreeksConfig) -> Self {
        let settings = OffloadSettings::from(config);
        let channel = Arc::new(OffloadChannel::from_settings(&settings));
        if OffloadChannel::install_shared(channel).is_err() {
            debug!("Offload channel already installed, reusing it");
        }

        let shared = OffloadChannel::shared();
        let calculator = shared.calculator();
        if calculator != settings.calculator {
            warn!(
                installed_rate = calculator.default_rate(),
                installed_days = calculator.days_per_year(),
                requested_rate = settings.calculator.default_rate(),
                requested_days = settings.calculator.days_per_year(),
                "Shared offload channel already installed with other pricing defaults; keeping them"
            );
        }

        Self::new(shared, calculator).with_single_fallback(config.fallback.single_fidelity.into())
    }

    pub fn calculator(&self) -> &BsmCalculator {
        self.processor.calculator()
    }

    pub fn single_fallback(&self) -> SingleFallback {
        self.single_fallback
    }

    /// Greeks for one contract
    pub async fn calculate_single(&self, mut input: OptionQuoteInput) -> GreeksResult {
        // Pin the rate so the worker and the fallback price with the same one
        input.risk_free_rate = Some(self.calculator().resolve_rate(input.risk_free_rate));

        let outcome = self
            .transport
            .request(Message::CalculateSingle(input.clone()))
            .await
            .and_then(|value| serde_json::from_value::<GreeksResult>(value).map_err(OffloadError::from));

        match outcome {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    error = %err,
                    remote = err.is_remote(),
                    fallback = ?self.single_fallback,
                    "Greeks offload failed, calculating in-process"
                );
                record_fallback("single");
                match self.single_fallback {
                    SingleFallback::DeltaOnly => self.calculator().delta_only(&input),
                    SingleFallback::Full => self.calculator().calculate(&input),
                }
            }
        }
    }

    /// Greeks for a chain of contracts on one underlying, in input order.
    ///
    /// Frames are JSON, which has no NaN or infinity, so a batch carrying a
    /// non-finite field cannot be read by the worker and is always answered
    /// by the in-process fallback.
    pub async fn calculate_batch(
        &self,
        items: Vec<BatchItem>,
        spot: f64,
        risk_free_rate: Option<f64>,
    ) -> Vec<BatchResultItem> {
        let rate = self.calculator().resolve_rate(risk_free_rate);
        let expected = items.len();
        let request = BatchRequest {
            options: items,
            spot,
            risk_free_rate: Some(rate),
        };

        let outcome = self
            .transport
            .request(Message::CalculateBatch(request.clone()))
            .await
            .and_then(|value| {
                serde_json::from_value::<Vec<BatchResultItem>>(value).map_err(OffloadError::from)
            })
            .and_then(|results| {
                if results.len() == expected {
                    Ok(results)
                } else {
                    Err(OffloadError::Protocol(format!(
                        "batch reply has {} items, expected {}",
                        results.len(),
                        expected
                    )))
                }
            });

        match outcome {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, remote = err.is_remote(), items = expected, "Batch greeks offload failed, calculating in-process");
                record_fallback("batch");
                self.processor.process(spot, Some(rate), &request.options)
            }
        }
    }

    /// True when the worker answered a PING with PONG
    pub async fn ping(&self) -> bool {
        match self.transport.request(Message::Ping).await {
            Ok(value) => value.as_str() == Some(crate::protocol::PONG),
            Err(err) => {
                debug!(error = %err, "Ping failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockOffloadTransport;
    use crate::host::DisabledHost;
    use greeks::OptionType;
    use serde_json::json;
    use std::time::Duration;

    fn atm_call() -> OptionQuoteInput {
        OptionQuoteInput::new(100.0, 100.0, 30.0, 0.2, OptionType::Call)
    }

    fn chain() -> Vec<BatchItem> {
        vec![
            BatchItem {
                strike: 95.0,
                option_type: OptionType::Call,
                implied_volatility_percent: 18.0,
                days_to_expiry: 30.0,
            },
            BatchItem {
                strike: 105.0,
                option_type: OptionType::Put,
                implied_volatility_percent: 22.0,
                days_to_expiry: 30.0,
            },
        ]
    }

    fn facade(mock: MockOffloadTransport) -> ClientFacade {
        ClientFacade::new(Arc::new(mock), BsmCalculator::default())
    }

    #[tokio::test]
    async fn test_single_uses_worker_result() {
        let expected = BsmCalculator::default().calculate(&atm_call());

        let mut mock = MockOffloadTransport::new();
        mock.expect_request()
            .withf(|message| {
                matches!(message, Message::CalculateSingle(input) if input.risk_free_rate == Some(0.05))
            })
            .times(1)
            .returning(move |_| Ok(serde_json::to_value(expected).unwrap()));

        let result = facade(mock).calculate_single(atm_call()).await;
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_single_timeout_falls_back_to_delta() {
        let mut mock = MockOffloadTransport::new();
        mock.expect_request()
            .returning(|_| Err(OffloadError::Timeout { id: 1, after_ms: 5000 }));

        let result = facade(mock).calculate_single(atm_call()).await;
        let full = BsmCalculator::default().calculate(&atm_call());

        assert_eq!(result.delta, full.delta);
        assert_eq!(result.gamma, 0.0);
        assert_eq!(result.theta, 0.0);
        assert_eq!(result.vega, 0.0);
        assert_eq!(result.rho, 0.0);
        assert_eq!(result.implied_volatility_percent, 20.0);
    }

    #[tokio::test]
    async fn test_single_full_fallback_matches_calculation() {
        let mut mock = MockOffloadTransport::new();
        mock.expect_request()
            .returning(|_| Err(OffloadError::remote("worker crashed")));

        let result = facade(mock)
            .with_single_fallback(SingleFallback::Full)
            .calculate_single(atm_call())
            .await;

        assert_eq!(result, BsmCalculator::default().calculate(&atm_call()));
    }

    #[tokio::test]
    async fn test_single_unreadable_payload_falls_back() {
        let mut mock = MockOffloadTransport::new();
        mock.expect_request().returning(|_| Ok(json!("not greeks")));

        let result = facade(mock).calculate_single(atm_call()).await;
        assert_eq!(result, BsmCalculator::default().delta_only(&atm_call()));
    }

    #[tokio::test]
    async fn test_batch_uses_worker_result() {
        let processor = BatchGreeksProcessor::new(BsmCalculator::default());
        let expected = processor.process(100.0, None, &chain());
        let payload = serde_json::to_value(&expected).unwrap();

        let mut mock = MockOffloadTransport::new();
        mock.expect_request()
            .withf(|message| {
                matches!(message, Message::CalculateBatch(req) if req.options.len() == 2 && req.spot == 100.0)
            })
            .times(1)
            .returning(move |_| Ok(payload.clone()));

        let results = facade(mock).calculate_batch(chain(), 100.0, None).await;
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn test_batch_remote_error_falls_back_in_order() {
        let mut mock = MockOffloadTransport::new();
        mock.expect_request()
            .returning(|_| Err(OffloadError::remote("Unknown message type: CALCULATE_BATCH")));

        let results = facade(mock).calculate_batch(chain(), 100.0, Some(0.07)).await;
        let expected = BatchGreeksProcessor::new(BsmCalculator::default()).process(100.0, Some(0.07), &chain());

        assert_eq!(results, expected);
        assert_eq!(results[0].item.strike, 95.0);
        assert_eq!(results[1].item.strike, 105.0);
    }

    #[tokio::test]
    async fn test_batch_short_reply_falls_back() {
        let mut mock = MockOffloadTransport::new();
        mock.expect_request().returning(|_| Ok(json!([])));

        let results = facade(mock).calculate_batch(chain(), 100.0, None).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_ping() {
        let mut up = MockOffloadTransport::new();
        up.expect_request()
            .withf(|message| matches!(message, Message::Ping))
            .returning(|_| Ok(json!("PONG")));
        assert!(facade(up).ping().await);

        let mut down = MockOffloadTransport::new();
        down.expect_request()
            .returning(|_| Err(OffloadError::unavailable("disabled")));
        assert!(!facade(down).ping().await);
    }

    #[tokio::test]
    async fn test_unavailable_channel_still_answers() {
        let channel = OffloadChannel::new(Arc::new(DisabledHost::default()), Duration::from_millis(5000));
        let facade = ClientFacade::new(Arc::new(channel), BsmCalculator::default());

        let single = facade.calculate_single(atm_call()).await;
        assert!(single.delta > 0.5 && single.delta < 0.6);

        let batch = facade.calculate_batch(chain(), 100.0, None).await;
        assert_eq!(batch.len(), 2);
        assert!(!facade.ping().await);
    }

    #[test]
    fn test_from_config_keeps_installed_pricing_defaults() {
        let mut first = config::GreeksConfig::default();
        first.pricing.default_risk_free_rate = 0.065;
        first.pricing.days_per_year = 252.0;
        first.offload.enabled = false;
        let installed = ClientFacade::from_config(&first);

        let mut second = config::GreeksConfig::default();
        second.pricing.default_risk_free_rate = 0.03;
        second.fallback.single_fidelity = config::SingleFallbackFidelity::Full;
        let reused = ClientFacade::from_config(&second);

        assert_eq!(reused.calculator(), installed.calculator());
        assert_eq!(reused.calculator(), &OffloadChannel::shared().calculator());
        assert_eq!(reused.calculator().default_rate(), 0.065);
        assert_eq!(reused.calculator().days_per_year(), 252.0);
        assert_eq!(reused.single_fallback(), SingleFallback::Full);
    }

    #[test]
    fn test_fallback_from_config() {
        assert_eq!(
            SingleFallback::from(config::SingleFallbackFidelity::Full),
            SingleFallback::Full
        );
        assert_eq!(SingleFallback::default(), SingleFallback::DeltaOnly);
    }
}

//! Message loop of the background context

use crate::error::OffloadError;
use crate::host::WorkerEndpoints;
use crate::protocol::{Message, RequestFrame, Response, PONG};
use greeks::BatchGreeksProcessor;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Serves request frames until the caller side goes away
#[derive(Debug, Clone, Copy, Default)]
pub struct Worker {
    processor: BatchGreeksProcessor,
}

impl Worker {
    pub fn new(processor: BatchGreeksProcessor) -> Self {
        Self { processor }
    }

    /// Announce readiness, then answer frames in arrival order.
    ///
    /// Returns when the request queue closes or nobody is left to read
    /// responses.
    pub fn run(self, endpoints: WorkerEndpoints) {
        let WorkerEndpoints {
            requests,
            responses,
        } = endpoints;

        if !send(&responses, &Response::Ready) {
            return;
        }
        info!("Greeks worker ready");

        while let Ok(frame) = requests.recv() {
            let Some(response) = self.handle_frame(&frame) else {
                continue;
            };
            if !send(&responses, &response) {
                break;
            }
        }

        info!("Greeks worker stopped");
    }

    /// Turn one request frame into its reply.
    ///
    /// `None` only when the frame carries no usable request ID, since such a
    /// reply could never be correlated.
    pub fn handle_frame(&self, frame: &str) -> Option<Response> {
        let request = match RequestFrame::decode(frame) {
            Ok(request) => request,
            Err(err) => {
                let id = serde_json::from_str::<Value>(frame)
                    .ok()
                    .and_then(|v| v.get("id").and_then(Value::as_u64));
                warn!(?id, error = %err, "Malformed request frame");
                return id.map(|id| Response::Error {
                    id,
                    error: err.to_string(),
                });
            }
        };

        let id = request.id;
        let kind = request.kind.clone();
        let outcome = request.into_message().and_then(|message| self.execute(message));

        Some(match outcome {
            Ok(result) => {
                debug!(id, kind = %kind, "Request served");
                Response::Success { id, result }
            }
            Err(err) => {
                warn!(id, kind = %kind, error = %err, "Request failed");
                Response::Error {
                    id,
                    error: err.to_string(),
                }
            }
        })
    }

    pub fn execute(&self, message: Message) -> Result<Value, OffloadError> {
        match message {
            Message::CalculateSingle(input) => {
                let greeks = self.processor.calculator().calculate(&input);
                Ok(serde_json::to_value(greeks)?)
            }
            Message::CalculateBatch(batch) => {
                let results = self
                    .processor
                    .process(batch.spot, batch.risk_free_rate, &batch.options);
                Ok(serde_json::to_value(results)?)
            }
            Message::Ping => Ok(Value::String(PONG.to_string())),
        }
    }
}

fn send(responses: &tokio::sync::mpsc::UnboundedSender<String>, response: &Response) -> bool {
    let frame = match response.encode() {
        Ok(frame) => frame,
        Err(err) => {
            error!(error = %err, "Failed to encode response");
            return true;
        }
    };

    if responses.send(frame).is_err() {
        debug!("Response queue closed, caller side gone");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use greeks::{BatchItem, BatchResultItem, GreeksResult, OptionQuoteInput, OptionType};
    use crate::protocol::BatchRequest;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn frame(id: u64, message: &Message) -> String {
        RequestFrame::new(id, message).unwrap().encode().unwrap()
    }

    #[test]
    fn test_single_matches_direct_calculation() {
        let worker = Worker::default();
        let input = OptionQuoteInput::new(18500.0, 18500.0, 7.0, 0.15, OptionType::Call).with_rate(0.05);

        let response = worker
            .handle_frame(&frame(1, &Message::CalculateSingle(input.clone())))
            .unwrap();

        assert_matches!(response, Response::Success { id: 1, result } => {
            let greeks: GreeksResult = serde_json::from_value(result).unwrap();
            assert_eq!(greeks, greeks::calculate_greeks(&input));
        });
    }

    #[test]
    fn test_batch_preserves_order() {
        let worker = Worker::default();
        let options: Vec<BatchItem> = [18400.0, 18500.0, 18600.0]
            .into_iter()
            .map(|strike| BatchItem {
                strike,
                option_type: OptionType::Put,
                implied_volatility_percent: 16.0,
                days_to_expiry: 3.0,
            })
            .collect();
        let message = Message::CalculateBatch(BatchRequest {
            options: options.clone(),
            spot: 18500.0,
            risk_free_rate: Some(0.05),
        });

        let response = worker.handle_frame(&frame(2, &message)).unwrap();

        assert_matches!(response, Response::Success { id: 2, result } => {
            let results: Vec<BatchResultItem> = serde_json::from_value(result).unwrap();
            let strikes: Vec<f64> = results.iter().map(|r| r.item.strike).collect();
            assert_eq!(strikes, vec![18400.0, 18500.0, 18600.0]);
        });
    }

    #[test]
    fn test_ping_answers_pong() {
        let response = Worker::default().handle_frame(&frame(3, &Message::Ping)).unwrap();
        assert_eq!(response, Response::Success { id: 3, result: json!("PONG") });
    }

    #[test]
    fn test_unknown_type_reported_as_error() {
        let response = Worker::default()
            .handle_frame(r#"{"id":4,"type":"CALCULATE_IV","data":{}}"#)
            .unwrap();

        assert_eq!(
            response,
            Response::Error {
                id: 4,
                error: "Unknown message type: CALCULATE_IV".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_frame_with_id() {
        let response = Worker::default().handle_frame(r#"{"id":5}"#).unwrap();
        assert_matches!(response, Response::Error { id: 5, .. });
    }

    #[test]
    fn test_garbage_frame_dropped() {
        assert!(Worker::default().handle_frame("not json").is_none());
    }
}

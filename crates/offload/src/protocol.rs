//! Wire protocol between callers and the background worker
//!
//! Frames are JSON strings, so the worker only ever sees copies of the
//! request data.
//!
//! Request: `{ "id": 7, "type": "CALCULATE_SINGLE" | "CALCULATE_BATCH" | "PING", "data": ... }`
//!
//! Response: `{ "id": 7, "type": "SUCCESS", "result": ... }`,
//! `{ "id": 7, "type": "ERROR", "error": "..." }` or `{ "type": "READY" }`

use crate::error::OffloadError;
use greeks::{BatchItem, OptionQuoteInput};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CALCULATE_SINGLE: &str = "CALCULATE_SINGLE";
pub const CALCULATE_BATCH: &str = "CALCULATE_BATCH";
pub const PING: &str = "PING";

/// Payload of a successful ping
pub const PONG: &str = "PONG";

/// Batch payload: strikes sharing one spot and rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub options: Vec<BatchItem>,
    pub spot: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_free_rate: Option<f64>,
}

/// Requests understood by the worker
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    CalculateSingle(OptionQuoteInput),
    CalculateBatch(BatchRequest),
    Ping,
}

impl Message {
    pub fn tag(&self) -> &'static str {
        match self {
            Message::CalculateSingle(_) => CALCULATE_SINGLE,
            Message::CalculateBatch(_) => CALCULATE_BATCH,
            Message::Ping => PING,
        }
    }
}

/// A request as it travels to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl RequestFrame {
    pub fn new(id: u64, message: &Message) -> Result<Self, OffloadError> {
        let data = match message {
            Message::CalculateSingle(input) => serde_json::to_value(input)?,
            Message::CalculateBatch(batch) => serde_json::to_value(batch)?,
            Message::Ping => Value::Null,
        };

        Ok(Self {
            id,
            kind: message.tag().to_string(),
            data,
        })
    }

    pub fn encode(&self) -> Result<String, OffloadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(frame: &str) -> Result<Self, OffloadError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Match the tag against the known message types
    pub fn into_message(self) -> Result<Message, OffloadError> {
        match self.kind.as_str() {
            CALCULATE_SINGLE => Ok(Message::CalculateSingle(serde_json::from_value(self.data)?)),
            CALCULATE_BATCH => Ok(Message::CalculateBatch(serde_json::from_value(self.data)?)),
            PING => Ok(Message::Ping),
            _ => Err(OffloadError::UnknownMessageType(self.kind)),
        }
    }
}

/// Replies and signals sent by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Success { id: u64, result: Value },
    Error { id: u64, error: String },
    /// Sent once when the worker has started; carries no ID
    Ready,
}

impl Response {
    pub fn id(&self) -> Option<u64> {
        match self {
            Response::Success { id, .. } | Response::Error { id, .. } => Some(*id),
            Response::Ready => None,
        }
    }

    pub fn encode(&self) -> Result<String, OffloadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(frame: &str) -> Result<Self, OffloadError> {
        Ok(serde_json::from_str(frame)?)
    }
}

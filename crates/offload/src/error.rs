//! Offload error types

use thiserror::Error;

/// Failures of the background path.
///
/// None of these reach callers of [`ClientFacade`](crate::ClientFacade); they
/// trigger the in-process fallback instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OffloadError {
    /// Background execution could not be started or has gone away
    #[error("Offload unavailable: {0}")]
    Unavailable(String),

    /// No reply within the request timeout
    #[error("Request {id} timed out after {after_ms} ms")]
    Timeout { id: u64, after_ms: u64 },

    /// The worker reported a failure
    #[error("Remote computation error: {0}")]
    Remote(String),

    /// The worker received a request tag it does not handle
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A frame or payload could not be encoded or decoded
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl OffloadError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// True for failures raised by the worker itself rather than the transport
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::UnknownMessageType(_))
    }
}

impl From<serde_json::Error> for OffloadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

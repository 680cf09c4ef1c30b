//! Greeks offload for GreekX
//!
//! Runs greeks calculations on a dedicated background thread and hands the
//! results back to async callers, with an in-process fallback whenever the
//! background path fails.
//!
//! # Core Components
//!
//! - [`protocol`] - Request/response frames exchanged with the worker
//! - [`correlation`] - Table of outstanding requests keyed by request ID
//! - [`host`] - Seam that starts the background execution context
//! - [`worker`] - Message loop run inside the background context
//! - [`channel`] - Lazily started, process-wide request/response channel
//! - [`facade`] - Call-site API that never surfaces offload failures
//! - [`stats`] - Counters mirrored into the `metrics` recorder
//!
//! # Key Invariants
//!
//! - Request IDs strictly increase and are never reused
//! - A pending request is settled exactly once, by its reply or its timeout,
//!   whichever comes first; the loser is a no-op
//! - A failed worker start is terminal: the channel stays `Unavailable`
//! - Only copies of serialized frames cross the thread boundary

pub mod channel;
pub mod correlation;
pub mod error;
pub mod facade;
pub mod host;
pub mod protocol;
pub mod stats;
pub mod worker;

pub use channel::{ChannelState, OffloadChannel, OffloadSettings, OffloadTransport};
pub use error::OffloadError;
pub use facade::{ClientFacade, SingleFallback};
pub use host::{DisabledHost, ExecutionHost, HostError, ThreadHost, WorkerEndpoints};
pub use protocol::{BatchRequest, Message, Response};
pub use stats::{OffloadStats, OffloadStatsSnapshot};

pub type Result<T> = std::result::Result<T, OffloadError>;

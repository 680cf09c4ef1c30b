//! Request/response channel to the background worker
//!
//! The channel starts its worker lazily on the first request and then lives
//! for the rest of the process. Each request is tagged with a fresh ID,
//! registered in the [`CorrelationTable`], and settled by whichever comes
//! first: the worker's reply or the request timeout.
//!
//! State machine:
//!
//! ```text
//! Uninitialized ──launch ok──> Starting ──READY──> Ready
//!       │                         │                 │
//!       └──launch failed──────────┴──worker gone────┴──> Unavailable (terminal)
//! ```

use crate::correlation::{CorrelationTable, Reply};
use crate::error::OffloadError;
use crate::host::{DisabledHost, ExecutionHost, ThreadHost, WorkerEndpoints};
use crate::protocol::{Message, RequestFrame, Response};
use crate::stats::{OffloadStats, OffloadStatsSnapshot};
use async_trait::async_trait;
use greeks::{BatchGreeksProcessor, BsmCalculator};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, error, info, warn};

static SHARED_CHANNEL: OnceLock<Arc<OffloadChannel>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// No worker start has been attempted
    Uninitialized,
    /// Worker launched, READY not yet received
    Starting,
    /// Worker announced READY
    Ready,
    /// Worker could not be started or has stopped; never left
    Unavailable,
}

/// Channel settings
#[derive(Debug, Clone)]
pub struct OffloadSettings {
    pub enabled: bool,
    pub request_timeout: Duration,
    pub worker_thread_name: String,
    pub calculator: BsmCalculator,
}

impl Default for OffloadSettings {
    fn default() -> Self {
        Self::from(&config::GreeksConfig::default())
    }
}

impl From<&config::GreeksConfig> for OffloadSettings {
    fn from(config: &config::GreeksConfig) -> Self {
        Self {
            enabled: config.offload.enabled,
            request_timeout: Duration::from_millis(config.offload.request_timeout_ms),
            worker_thread_name: config.offload.worker_thread_name.clone(),
            calculator: BsmCalculator::new(config.pricing.default_risk_free_rate)
                .with_days_per_year(config.pricing.days_per_year),
        }
    }
}

/// Anything that can carry a [`Message`] to a worker and return its result
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OffloadTransport: Send + Sync {
    async fn request(&self, message: Message) -> Result<Value, OffloadError>;
}

struct Link {
    state: ChannelState,
    outbound: Option<mpsc::Sender<String>>,
}

/// State reachable from both the callers and the dispatcher thread
struct Shared {
    link: Mutex<Link>,
    table: CorrelationTable,
    stats: OffloadStats,
}

impl Shared {
    fn state(&self) -> ChannelState {
        self.link.lock().state
    }

    fn mark_ready(&self) {
        let mut link = self.link.lock();
        if link.state == ChannelState::Starting {
            link.state = ChannelState::Ready;
            info!("Greeks offload channel ready");
        }
    }

    fn mark_unavailable(&self, reason: &str) {
        let mut link = self.link.lock();
        if link.state != ChannelState::Unavailable {
            warn!(reason, previous = ?link.state, "Greeks offload channel unavailable");
        }
        link.state = ChannelState::Unavailable;
        // Dropping the sender lets a still-running worker drain and exit
        link.outbound = None;
    }

    /// Settle `id` with `reply`. Stats are recorded before the waiter wakes.
    fn settle(&self, id: u64, reply: Reply) {
        let Some(pending) = self.table.take(id) else {
            self.stats.record_late_response();
            debug!(id, "Dropping reply for an already settled request");
            return;
        };

        if reply.is_err() {
            self.stats.record_remote_error();
        }
        self.stats.record_completed(pending.elapsed());
        self.stats.set_pending(self.table.len());
        pending.deliver(reply);
    }
}

/// Removes the table entry when the awaiting caller finishes or is dropped
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.shared.table.discard(self.id) {
            self.shared.stats.set_pending(self.shared.table.len());
        }
    }
}

/// Request/response channel to one background worker
pub struct OffloadChannel {
    host: Arc<dyn ExecutionHost>,
    timeout: Duration,
    /// Pricing defaults the worker prices with
    calculator: BsmCalculator,
    next_id: AtomicU64,
    shared: Arc<Shared>,
}

impl OffloadChannel {
    pub fn new(host: Arc<dyn ExecutionHost>, timeout: Duration) -> Self {
        Self {
            host,
            timeout,
            calculator: BsmCalculator::default(),
            next_id: AtomicU64::new(0),
            shared: Arc::new(Shared {
                link: Mutex::new(Link {
                    state: ChannelState::Uninitialized,
                    outbound: None,
                }),
                table: CorrelationTable::new(),
                stats: OffloadStats::new(),
            }),
        }
    }

    /// Thread-hosted channel, or a permanently unavailable one when offload is disabled
    pub fn from_settings(settings: &OffloadSettings) -> Self {
        let host: Arc<dyn ExecutionHost> = if settings.enabled {
            Arc::new(ThreadHost::new(
                settings.worker_thread_name.clone(),
                BatchGreeksProcessor::new(settings.calculator),
            ))
        } else {
            Arc::new(DisabledHost::default())
        };
        Self::new(host, settings.request_timeout).with_calculator(settings.calculator)
    }

    /// Record the pricing defaults the host's worker was built with
    pub fn with_calculator(mut self, calculator: BsmCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    /// The process-wide channel, created with default settings on first use
    /// unless [`install_shared`](Self::install_shared) ran before.
    ///
    /// Replies are dispatched on a dedicated thread, so the channel may be
    /// used from any runtime for the life of the process.
    pub fn shared() -> Arc<Self> {
        SHARED_CHANNEL
            .get_or_init(|| Arc::new(Self::from_settings(&OffloadSettings::default())))
            .clone()
    }

    /// Make `channel` the process-wide channel. Fails, handing it back, when
    /// one is already in place.
    pub fn install_shared(channel: Arc<Self>) -> Result<(), Arc<Self>> {
        SHARED_CHANNEL.set(channel)
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn pending_requests(&self) -> usize {
        self.shared.table.len()
    }

    pub fn stats(&self) -> OffloadStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn calculator(&self) -> BsmCalculator {
        self.calculator
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Sender for request frames, launching the worker on first use
    fn connect(&self) -> Result<mpsc::Sender<String>, OffloadError> {
        let mut link = self.shared.link.lock();

        match link.state {
            ChannelState::Unavailable => {
                return Err(OffloadError::unavailable("greeks worker unavailable"));
            }
            ChannelState::Starting | ChannelState::Ready => {
                return link
                    .outbound
                    .clone()
                    .ok_or_else(|| OffloadError::unavailable("greeks worker has no request queue"));
            }
            ChannelState::Uninitialized => {}
        }

        link.state = ChannelState::Starting;
        info!(host = self.host.name(), "Starting greeks worker");

        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = unbounded_channel();
        let endpoints = WorkerEndpoints {
            requests: request_rx,
            responses: response_tx,
        };

        if let Err(err) = self.host.launch(endpoints) {
            link.state = ChannelState::Unavailable;
            error!(host = self.host.name(), error = %err, "Greeks worker failed to start");
            return Err(OffloadError::unavailable(err.to_string()));
        }

        // Replies are routed off any runtime so the channel outlives the one that started it
        let shared = Arc::clone(&self.shared);
        let dispatcher = std::thread::Builder::new()
            .name(format!("{}-dispatch", self.host.name()))
            .spawn(move || dispatch(shared, response_rx));
        if let Err(err) = dispatcher {
            link.state = ChannelState::Unavailable;
            error!(host = self.host.name(), error = %err, "Reply dispatcher failed to start");
            return Err(OffloadError::unavailable(err.to_string()));
        }

        link.outbound = Some(request_tx.clone());
        Ok(request_tx)
    }

    /// Send `message` to the worker and wait for its reply or the timeout
    pub async fn send(&self, message: Message) -> Result<Value, OffloadError> {
        let outbound = self.connect()?;

        let id = self.next_request_id();
        let frame = RequestFrame::new(id, &message)?.encode()?;

        let mut reply = self.shared.table.register(id);
        let _guard = PendingGuard {
            shared: &self.shared,
            id,
        };
        self.shared.stats.record_request();
        self.shared.stats.set_pending(self.shared.table.len());
        debug!(id, kind = message.tag(), "Offloading request");

        if outbound.send(frame).is_err() {
            self.shared.mark_unavailable("worker request queue closed");
            return Err(OffloadError::unavailable("greeks worker has stopped"));
        }

        match tokio::time::timeout(self.timeout, &mut reply).await {
            Ok(delivered) => delivered.unwrap_or_else(|_| Err(reply_dropped(id))),
            Err(_elapsed) => {
                if self.shared.table.discard(id) {
                    let after_ms = self.timeout.as_millis() as u64;
                    self.shared.stats.record_timeout();
                    warn!(id, after_ms, "Offload request timed out");
                    Err(OffloadError::Timeout { id, after_ms })
                } else {
                    // The reply claimed the entry just before the timer fired
                    reply.await.unwrap_or_else(|_| Err(reply_dropped(id)))
                }
            }
        }
    }
}

impl Drop for OffloadChannel {
    fn drop(&mut self) {
        // Closing the request queue stops the worker, which in turn ends the dispatcher
        self.shared.link.lock().outbound = None;
    }
}

#[async_trait]
impl OffloadTransport for OffloadChannel {
    async fn request(&self, message: Message) -> Result<Value, OffloadError> {
        self.send(message).await
    }
}

fn reply_dropped(id: u64) -> OffloadError {
    OffloadError::unavailable(format!("reply for request {} was dropped", id))
}

/// Route worker frames to their pending requests until the worker goes away.
///
/// Runs on its own thread; every step is synchronous.
fn dispatch(shared: Arc<Shared>, mut responses: UnboundedReceiver<String>) {
    while let Some(frame) = responses.blocking_recv() {
        match Response::decode(&frame) {
            Ok(Response::Ready) => shared.mark_ready(),
            Ok(Response::Success { id, result }) => shared.settle(id, Ok(result)),
            Ok(Response::Error { id, error }) => {
                shared.settle(id, Err(OffloadError::Remote(error)))
            }
            Err(err) => warn!(error = %err, "Dropping undecodable response frame"),
        }
    }

    shared.mark_unavailable("worker response queue closed");
}

//! Background execution hosts
//!
//! A host owns the capability to start the isolated context the worker runs
//! in. The channel only talks to it through [`ExecutionHost::launch`], which
//! makes the capability swappable: a real OS thread in production, nothing at
//! all when offload is disabled, or a hand-driven fake in tests.

use crate::worker::Worker;
use greeks::BatchGreeksProcessor;
use std::sync::mpsc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// The worker's ends of the two frame queues
#[derive(Debug)]
pub struct WorkerEndpoints {
    /// Request frames from callers
    pub requests: mpsc::Receiver<String>,
    /// Response frames back to the dispatcher
    pub responses: UnboundedSender<String>,
}

#[derive(Error, Debug)]
pub enum HostError {
    /// The environment offers no background execution
    #[error("background execution not supported: {0}")]
    Unsupported(String),

    /// The environment refused to start the context
    #[error("failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Starts the background execution context
pub trait ExecutionHost: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Start a worker serving `endpoints`. Must not block on the worker.
    fn launch(&self, endpoints: WorkerEndpoints) -> Result<(), HostError>;
}

/// Runs the worker on a dedicated, named OS thread
#[derive(Debug, Clone)]
pub struct ThreadHost {
    thread_name: String,
    processor: BatchGreeksProcessor,
}

impl Default for ThreadHost {
    fn default() -> Self {
        Self::new(config::default_worker_thread_name(), BatchGreeksProcessor::default())
    }
}

impl ThreadHost {
    pub fn new(thread_name: impl Into<String>, processor: BatchGreeksProcessor) -> Self {
        Self {
            thread_name: thread_name.into(),
            processor,
        }
    }
}

impl ExecutionHost for ThreadHost {
    fn name(&self) -> &str {
        &self.thread_name
    }

    fn launch(&self, endpoints: WorkerEndpoints) -> Result<(), HostError> {
        let worker = Worker::new(self.processor);

        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run(endpoints))?;

        info!(thread = %self.thread_name, "Greeks worker thread spawned");
        Ok(())
    }
}

/// Host for environments without background execution
#[derive(Debug, Clone)]
pub struct DisabledHost {
    reason: String,
}

impl DisabledHost {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DisabledHost {
    fn default() -> Self {
        Self::new("offload disabled by configuration")
    }
}

impl ExecutionHost for DisabledHost {
    fn name(&self) -> &str {
        "disabled"
    }

    fn launch(&self, _endpoints: WorkerEndpoints) -> Result<(), HostError> {
        Err(HostError::Unsupported(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Response;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc::unbounded_channel;

    fn endpoints() -> (mpsc::Sender<String>, tokio::sync::mpsc::UnboundedReceiver<String>, WorkerEndpoints) {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = unbounded_channel();
        (
            req_tx,
            resp_rx,
            WorkerEndpoints {
                requests: req_rx,
                responses: resp_tx,
            },
        )
    }

    #[test]
    fn test_disabled_host_refuses() {
        let (_tx, _rx, ep) = endpoints();
        let err = DisabledHost::default().launch(ep).unwrap_err();
        assert_matches!(err, HostError::Unsupported(_));
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn test_thread_host_signals_ready() {
        let (req_tx, mut resp_rx, ep) = endpoints();
        let host = ThreadHost::new("greeks-test", BatchGreeksProcessor::default());
        assert_eq!(host.name(), "greeks-test");

        host.launch(ep).unwrap();

        let first = resp_rx.recv().await.unwrap();
        assert_eq!(Response::decode(&first).unwrap(), Response::Ready);

        // Closing the request queue stops the worker, which closes the response queue
        drop(req_tx);
        assert!(resp_rx.recv().await.is_none());
    }
}

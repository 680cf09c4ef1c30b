//! Offload counters
//!
//! Each event bumps an in-process atomic (read back by `ping` and tests) and
//! the matching metric in whatever `metrics` recorder is installed.

use metrics::{counter, gauge, histogram};
use observability::metrics as names;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct OffloadStats {
    requests: AtomicU64,
    completed: AtomicU64,
    timeouts: AtomicU64,
    late_responses: AtomicU64,
    remote_errors: AtomicU64,
}

/// Point-in-time copy of [`OffloadStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OffloadStatsSnapshot {
    pub requests: u64,
    pub completed: u64,
    pub timeouts: u64,
    pub late_responses: u64,
    pub remote_errors: u64,
}

impl OffloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter!(names::OFFLOAD_REQUESTS_TOTAL).increment(1);
    }

    pub fn record_completed(&self, elapsed: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        histogram!(names::OFFLOAD_REQUEST_DURATION_SECONDS).record(elapsed.as_secs_f64());
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        counter!(names::OFFLOAD_TIMEOUTS_TOTAL).increment(1);
    }

    pub fn record_late_response(&self) {
        self.late_responses.fetch_add(1, Ordering::Relaxed);
        counter!(names::OFFLOAD_LATE_RESPONSES_TOTAL).increment(1);
    }

    pub fn record_remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
        counter!(names::OFFLOAD_REMOTE_ERRORS_TOTAL).increment(1);
    }

    pub fn set_pending(&self, pending: usize) {
        gauge!(names::OFFLOAD_PENDING).set(pending as f64);
    }

    pub fn snapshot(&self) -> OffloadStatsSnapshot {
        OffloadStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            late_responses: self.late_responses.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
        }
    }
}

/// Count a caller-side recomputation; `kind` is `single` or `batch`
pub fn record_fallback(kind: &'static str) {
    counter!(names::FALLBACK_TOTAL, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = OffloadStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_completed(Duration::from_millis(3));
        stats.record_timeout();
        stats.record_late_response();

        assert_eq!(
            stats.snapshot(),
            OffloadStatsSnapshot {
                requests: 2,
                completed: 1,
                timeouts: 1,
                late_responses: 1,
                remote_errors: 0,
            }
        );
    }
}

//! Correlation table of outstanding requests
//!
//! Every request gets an entry at send time. The entry is removed exactly
//! once: by its reply, by its timeout, or by a failed send. Whoever removes it
//! owns the outcome; later arrivals find nothing and have no effect.

use crate::error::OffloadError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Outcome delivered to the waiting caller
pub type Reply = Result<Value, OffloadError>;

/// One outstanding request
#[derive(Debug)]
pub struct PendingRequest {
    pub id: u64,
    pub sent_at: Instant,
    reply: oneshot::Sender<Reply>,
}

impl PendingRequest {
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }

    /// Hand `reply` to the waiter. A waiter dropped by a cancelled caller is ignored.
    pub fn deliver(self, reply: Reply) {
        let _ = self.reply.send(reply);
    }
}

/// Request ID → pending request.
///
/// Replies are settled from the dispatcher thread while timeouts are settled
/// from the caller's task, so access goes through a mutex. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<u64, PendingRequest>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry for `id` and return the receiving half of its reply.
    ///
    /// IDs are never reused, so an existing entry means a caller bug; the old
    /// entry is replaced and its waiter sees a closed channel.
    pub fn register(&self, id: u64) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest {
            id,
            sent_at: Instant::now(),
            reply: tx,
        };

        let replaced = self.entries.lock().insert(id, pending);
        debug_assert!(replaced.is_none(), "request id {} registered twice", id);
        rx
    }

    /// Remove the entry and deliver `reply` to its waiter.
    ///
    /// Returns the round-trip time when the entry was still live, `None` when
    /// it had already been settled.
    pub fn resolve(&self, id: u64, reply: Reply) -> Option<Duration> {
        let pending = self.take(id)?;
        let elapsed = pending.elapsed();
        pending.deliver(reply);
        Some(elapsed)
    }

    /// Remove the live entry for `id` so the caller can settle it itself
    pub fn take(&self, id: u64) -> Option<PendingRequest> {
        self.entries.lock().remove(&id)
    }

    /// Remove the entry without delivering anything.
    ///
    /// Returns false when a reply already claimed it.
    pub fn discard(&self, id: u64) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_delivers_once() {
        let table = CorrelationTable::new();
        let rx = table.register(1);

        assert!(table.resolve(1, Ok(json!("first"))).is_some());
        assert!(table.resolve(1, Ok(json!("second"))).is_none());
        assert!(table.is_empty());

        assert_eq!(rx.await.unwrap(), Ok(json!("first")));
    }

    #[tokio::test]
    async fn test_discard_then_reply_is_noop() {
        let table = CorrelationTable::new();
        let mut rx = table.register(7);

        assert!(table.discard(7));
        assert!(!table.discard(7));
        assert!(table.resolve(7, Ok(json!(1))).is_none());

        // Sender dropped with the entry, nothing was delivered
        assert_matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_reply_then_discard_reports_loser() {
        let table = CorrelationTable::new();
        let rx = table.register(2);

        table.resolve(2, Err(OffloadError::remote("bad input")));
        assert!(!table.discard(2));
        assert_eq!(rx.await.unwrap(), Err(OffloadError::remote("bad input")));
    }

    #[test]
    fn test_waiter_pending_until_resolved() {
        let table = CorrelationTable::new();
        let mut waiter = tokio_test::task::spawn(table.register(3));

        tokio_test::assert_pending!(waiter.poll());
        table.resolve(3, Ok(json!("PONG")));

        assert!(waiter.is_woken());
        assert_eq!(tokio_test::assert_ready_ok!(waiter.poll()), Ok(json!("PONG")));
    }

    #[tokio::test]
    async fn test_take_then_deliver() {
        let table = CorrelationTable::new();
        let rx = table.register(8);

        let pending = table.take(8).unwrap();
        assert_eq!(pending.id, 8);
        assert!(table.take(8).is_none());
        assert!(table.resolve(8, Ok(json!("late"))).is_none());

        pending.deliver(Ok(json!("on time")));
        assert_eq!(rx.await.unwrap(), Ok(json!("on time")));
    }

    #[test]
    fn test_entries_independent() {
        let table = CorrelationTable::new();
        let _a = table.register(10);
        let _b = table.register(11);

        assert_eq!(table.len(), 2);
        assert!(table.discard(10));
        assert!(table.contains(11));
        assert!(!table.contains(10));
    }

    #[test]
    fn test_resolve_with_dropped_waiter() {
        let table = CorrelationTable::new();
        drop(table.register(4));
        assert!(table.resolve(4, Ok(json!(null))).is_some());
        assert!(table.is_empty());
    }
}

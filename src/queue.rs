//! Pending queue of not-yet-dispatched work items.
//!
//! A single-ended FIFO shared between the submitting callers (producers),
//! the release scheduler (batch consumer on tick), and the final drain at
//! shutdown. All access goes through one mutex, so every item is handed to
//! exactly one consumer.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;

use crate::transport::DeliveryResponse;

/// Callback invoked exactly once with the response of a successful delivery.
pub(crate) type CompletionHandler = Box<dyn FnOnce(DeliveryResponse) + Send + 'static>;

/// One queued unit of work: a serialized payload plus an optional
/// completion handler.
///
/// Immutable once created. Owned by the queue until popped, then by the
/// single delivery task processing it.
pub(crate) struct WorkItem {
    pub payload: Bytes,
    pub on_complete: Option<CompletionHandler>,
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("payload_bytes", &self.payload.len())
            .field("has_handler", &self.on_complete.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<WorkItem>,
    closed: bool,
}

/// Thread-safe FIFO queue of pending work items.
///
/// Only tail insert and head removal are exposed; insertion order is
/// submission order and consumption is strictly FIFO. Once drained the
/// queue is closed: a push racing with the drain either lands before it
/// (and is returned by the drain) or is rejected, never stranded.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    inner: Mutex<Inner>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item at the tail.
    ///
    /// Returns `false` without queueing once the queue has been closed by
    /// [`drain`](Self::drain).
    pub fn push(&self, item: WorkItem) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.items.push_back(item);
        true
    }

    /// Removes up to `max` items from the head, in FIFO order.
    ///
    /// Takes whatever is present without waiting for more. The whole batch
    /// is popped under one lock acquisition so a concurrent drain can never
    /// observe a partially released tick.
    pub fn pop_batch(&self, max: usize) -> Vec<WorkItem> {
        let mut inner = self.lock();
        let count = inner.items.len().min(max);
        inner.items.drain(..count).collect()
    }

    /// Closes the queue to further pushes and removes everything still
    /// queued, in FIFO order.
    ///
    /// The close and the removal happen under one lock acquisition, so
    /// every accepted item is either returned here or was already popped.
    pub fn drain(&self) -> Vec<WorkItem> {
        let mut inner = self.lock();
        inner.closed = true;
        inner.items.drain(..).collect()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    // The queue guards plain VecDeque operations that cannot panic, so a
    // poisoned lock carries no torn state worth halting for.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(tag: &str) -> WorkItem {
        WorkItem { payload: Bytes::from(tag.to_string()), on_complete: None }
    }

    fn tags(items: &[WorkItem]) -> Vec<&[u8]> {
        items.iter().map(|i| i.payload.as_ref()).collect()
    }

    #[test]
    fn pop_batch_preserves_fifo_order() {
        let queue = PendingQueue::new();
        queue.push(item("a"));
        queue.push(item("b"));
        queue.push(item("c"));

        let batch = queue.pop_batch(2);
        assert_eq!(tags(&batch), vec![b"a".as_ref(), b"b".as_ref()]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn pop_batch_takes_fewer_when_queue_is_short() {
        let queue = PendingQueue::new();
        queue.push(item("a"));

        let batch = queue.pop_batch(5);
        assert_eq!(batch.len(), 1);
        assert_eq!(queue.len(), 0);

        assert!(queue.pop_batch(5).is_empty());
    }

    #[test]
    fn drain_empties_queue_in_order() {
        let queue = PendingQueue::new();
        for tag in ["x", "y", "z"] {
            queue.push(item(tag));
        }

        let drained = queue.drain();
        assert_eq!(tags(&drained), vec![b"x".as_ref(), b"y".as_ref(), b"z".as_ref()]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn push_after_drain_is_rejected() {
        let queue = PendingQueue::new();
        assert!(queue.push(item("a")));

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);

        assert!(!queue.push(item("b")));
        assert_eq!(queue.len(), 0);
        assert!(queue.drain().is_empty());
    }
}

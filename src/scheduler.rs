//! Periodic release scheduler driving rate-paced dispatch.
//!
//! One timer task ticks once per window, starting immediately, and releases
//! up to `limit` queued items per tick. Each released item becomes its own
//! detached delivery task, so a slow or failing delivery never blocks the
//! timer, other deliveries, or future ticks. The limit bounds how many
//! deliveries are *initiated* per window, not how many are in flight.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{DispatchError, ErrorCategory},
    queue::{PendingQueue, WorkItem},
    transport::DeliveryTransport,
};

/// Counters shared between the dispatcher handle and its background tasks.
///
/// Scoped to one dispatcher instance and updated with atomic increments
/// only; the sequence counter doubles as the per-delivery log identifier.
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    pub submitted: AtomicU64,
    pub released: AtomicU64,
    pub delivered: AtomicU64,
    pub failed: AtomicU64,
    pub in_flight: AtomicU64,
}

/// Timer loop that pops queued items and hands them to delivery tasks.
pub(crate) struct ReleaseScheduler {
    pub queue: Arc<PendingQueue>,
    pub transport: Arc<dyn DeliveryTransport>,
    pub limit: usize,
    pub window: Duration,
    pub counters: Arc<DispatchCounters>,
    /// Stops the tick loop; in-flight deliveries are unaffected.
    pub shutdown: CancellationToken,
    /// Hard-aborts in-flight deliveries; only fired when a running
    /// dispatcher is dropped without shutdown.
    pub abort: CancellationToken,
}

impl ReleaseScheduler {
    /// Runs the tick loop until the shutdown token fires.
    ///
    /// The first tick completes at time zero, so items submitted before
    /// startup do not wait a full window.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.window);
        // Delay rather than burst after a stall, so a window-aligned bucket
        // never sees more than `limit` releases.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            limit = self.limit,
            window_ms = self.window.as_millis() as u64,
            "release scheduler started"
        );

        loop {
            tokio::select! {
                // Shutdown wins when both are ready: once signalled, no
                // further items may be popped by a tick.
                biased;
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.release_batch(),
            }
        }

        info!("release scheduler stopped");
    }

    /// Releases up to `limit` items from the queue head, FIFO.
    ///
    /// Returns without waiting for any delivery to complete.
    fn release_batch(&self) {
        let batch = self.queue.pop_batch(self.limit);
        if batch.is_empty() {
            return;
        }

        debug!(released = batch.len(), pending = self.queue.len(), "releasing batch");

        for item in batch {
            let seq = self.counters.released.fetch_add(1, Ordering::Relaxed) + 1;
            self.counters.in_flight.fetch_add(1, Ordering::Relaxed);

            let transport = Arc::clone(&self.transport);
            let counters = Arc::clone(&self.counters);
            let abort = self.abort.clone();
            tokio::spawn(deliver_one(seq, item, transport, counters, abort));
        }
    }
}

/// Delivers one item and reports its outcome.
///
/// Failure here is terminal for this item only: the error is classified and
/// logged, the handler is not invoked, and nothing is re-queued.
async fn deliver_one(
    seq: u64,
    item: WorkItem,
    transport: Arc<dyn DeliveryTransport>,
    counters: Arc<DispatchCounters>,
    abort: CancellationToken,
) {
    debug!(delivery = seq, bytes = item.payload.len(), "delivery started");

    let result = tokio::select! {
        result = transport.deliver(item.payload.clone()) => result,
        () = abort.cancelled() => Err(DispatchError::Cancelled),
    };

    counters.in_flight.fetch_sub(1, Ordering::Relaxed);

    match result {
        Ok(response) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
            info!(
                delivery = seq,
                status = response.status_code,
                duration_ms = response.duration.as_millis() as u64,
                "delivery completed"
            );

            if let Some(on_complete) = item.on_complete {
                on_complete(response);
            }
        },
        Err(error) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                delivery = seq,
                category = %ErrorCategory::from(&error),
                error = %error,
                "delivery failed"
            );
        },
    }
}

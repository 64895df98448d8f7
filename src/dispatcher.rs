//! Dispatcher surface: construction, submission, and graceful drain.
//!
//! The dispatcher owns the pending queue and the background release
//! scheduler. Submissions serialize immediately and enqueue without ever
//! waiting on the rate limit; shutdown stops the scheduler and hands every
//! never-released document back to the caller.

use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    client::{ClientConfig, HttpTransport},
    error::{DispatchError, Result},
    queue::{CompletionHandler, PendingQueue, WorkItem},
    scheduler::{DispatchCounters, ReleaseScheduler},
    transport::{DeliveryResponse, DeliveryTransport},
};

/// Lifecycle state of a dispatcher.
///
/// Transitions are one-way: `Created → Running` at construction,
/// `Running → Draining → Stopped` during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    /// Constructed but scheduler not yet started.
    Created = 0,
    /// Scheduler ticking; submissions accepted.
    Running = 1,
    /// Shutdown in progress; ticks disabled, queue being drained.
    Draining = 2,
    /// Drain complete; submissions rejected.
    Stopped = 3,
}

impl ServiceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Configuration for a dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of deliveries initiated per window.
    pub limit: usize,
    /// Length of the release window.
    pub window: Duration,
    /// HTTP transport configuration.
    pub client: ClientConfig,
}

impl DispatcherConfig {
    /// Creates a config with default client settings for the given endpoint.
    pub fn new(limit: usize, window: Duration, endpoint_url: impl Into<String>) -> Self {
        Self { limit, window, client: ClientConfig::new(endpoint_url) }
    }

    /// Validates the rate limit parameters.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` if `limit` is zero or the
    /// window is empty.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(DispatchError::configuration("limit must be greater than zero"));
        }
        if self.window.is_zero() {
            return Err(DispatchError::configuration("window must be greater than zero"));
        }
        Ok(())
    }
}

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Documents accepted by `submit`.
    pub submitted: u64,
    /// Items handed to delivery tasks by the scheduler.
    pub released: u64,
    /// Deliveries that received a response.
    pub delivered: u64,
    /// Deliveries that failed in transport.
    pub failed: u64,
    /// Deliveries currently in flight. Unbounded by the rate limit when
    /// delivery latency exceeds the window.
    pub in_flight: u64,
}

/// Rate-paced dispatcher for documents of type `T`.
///
/// Submissions are serialized eagerly and queued; a background scheduler
/// releases at most `limit` deliveries per `window` to the configured
/// endpoint. `shutdown` stops the scheduler and returns every document that
/// was never released, in submission order. In-flight deliveries survive
/// shutdown and run to their own completion.
///
/// Dropping a dispatcher that was never shut down cancels the scheduler and
/// aborts in-flight deliveries so no background work is orphaned.
pub struct Dispatcher<T> {
    config: DispatcherConfig,
    queue: Arc<PendingQueue>,
    counters: Arc<DispatchCounters>,
    state: AtomicU8,
    shutdown_token: CancellationToken,
    abort_token: CancellationToken,
    _document: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> Dispatcher<T> {
    /// Creates a dispatcher delivering over HTTP and starts its scheduler
    /// immediately (first tick at time zero).
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` for an invalid rate limit or
    /// an HTTP client that cannot be built.
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.client.clone())?);
        Self::with_transport(config, transport)
    }

    /// Creates a dispatcher using the provided transport.
    ///
    /// This constructor allows dependency injection of the delivery
    /// transport, enabling deterministic tests without a live endpoint.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` for an invalid rate limit.
    pub fn with_transport(
        config: DispatcherConfig,
        transport: Arc<dyn DeliveryTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(PendingQueue::new());
        let counters = Arc::new(DispatchCounters::default());
        let shutdown_token = CancellationToken::new();
        let abort_token = CancellationToken::new();
        let state = AtomicU8::new(ServiceState::Created as u8);

        let scheduler = ReleaseScheduler {
            queue: Arc::clone(&queue),
            transport,
            limit: config.limit,
            window: config.window,
            counters: Arc::clone(&counters),
            shutdown: shutdown_token.clone(),
            abort: abort_token.clone(),
        };
        tokio::spawn(scheduler.run());
        state.store(ServiceState::Running as u8, Ordering::Release);

        info!(
            limit = config.limit,
            window_ms = config.window.as_millis() as u64,
            endpoint = %config.client.endpoint_url,
            "dispatcher started"
        );

        Ok(Self {
            config,
            queue,
            counters,
            state,
            shutdown_token,
            abort_token,
            _document: PhantomData,
        })
    }

    /// Serializes the document and appends it to the pending queue.
    ///
    /// Returns as soon as the item is queued; never waits on the rate
    /// limit, dispatch, or delivery.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Serialization` if the document cannot be
    /// encoded (the item is never queued), or `DispatchError::Stopped`
    /// after shutdown.
    pub fn submit(&self, document: &T) -> Result<()> {
        self.enqueue(document, None)
    }

    /// Like [`submit`](Self::submit), with a completion handler invoked
    /// exactly once with the response if the delivery succeeds.
    ///
    /// The handler is never invoked for a failed delivery, and never more
    /// than once.
    ///
    /// # Errors
    ///
    /// Same conditions as [`submit`](Self::submit).
    pub fn submit_with_handler<F>(&self, document: &T, on_complete: F) -> Result<()>
    where
        F: FnOnce(DeliveryResponse) + Send + 'static,
    {
        self.enqueue(document, Some(Box::new(on_complete)))
    }

    fn enqueue(&self, document: &T, on_complete: Option<CompletionHandler>) -> Result<()> {
        if self.state() != ServiceState::Running {
            return Err(DispatchError::Stopped);
        }

        let payload = serde_json::to_vec(document)
            .map_err(|e| DispatchError::serialization(e.to_string()))?;

        // The queue rejects the push if a concurrent shutdown closed it
        // after the state check above; an accepted item is always either
        // released by a tick or returned by the drain.
        if !self.queue.push(WorkItem { payload: Bytes::from(payload), on_complete }) {
            return Err(DispatchError::Stopped);
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stops the scheduler and returns every never-released document in
    /// submission order.
    ///
    /// No further ticks occur after this call. Deliveries already in flight
    /// are neither awaited nor cancelled; they run to their own completion
    /// or failure in the background. A second call is a no-op returning an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Serialization` if a drained payload cannot
    /// be decoded back into a document.
    pub fn shutdown(&self) -> Result<Vec<T>> {
        let transitioned = self.state.compare_exchange(
            ServiceState::Running as u8,
            ServiceState::Draining as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if transitioned.is_err() {
            return Ok(Vec::new());
        }

        info!("dispatcher shutting down");
        self.shutdown_token.cancel();

        let items = self.queue.drain();
        let documents = items
            .iter()
            .map(|item| {
                serde_json::from_slice(&item.payload)
                    .map_err(|e| DispatchError::serialization(e.to_string()))
            })
            .collect::<Result<Vec<T>>>();

        self.state.store(ServiceState::Stopped as u8, Ordering::Release);

        match &documents {
            Ok(drained) => info!(drained = drained.len(), "dispatcher stopped"),
            Err(error) => warn!(error = %error, "dispatcher stopped; drain lost a payload"),
        }
        documents
    }
}

impl<T> Dispatcher<T> {
    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of items queued but not yet released.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the dispatcher's counters.
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
        }
    }

    /// Configuration this dispatcher was built with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

impl<T> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        // A graceful shutdown already stopped the scheduler and deliberately
        // leaves in-flight deliveries running. Only an abandoned running
        // dispatcher needs the hard stop.
        if self.state() == ServiceState::Running {
            warn!("dispatcher dropped while running; aborting scheduler and in-flight deliveries");
            self.shutdown_token.cancel();
            self.abort_token.cancel();
        }
    }
}

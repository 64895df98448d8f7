//! Rate-paced request dispatcher.
//!
//! Callers submit serializable documents for delivery to a single remote
//! endpoint. The dispatcher guarantees that no more than a configured number
//! of deliveries is *initiated* per time window, queues the excess, invokes
//! an optional completion handler per delivered item, and hands every
//! never-released document back to the caller on shutdown.
//!
//! # Architecture
//!
//! ```text
//! submit(document) ──▶ Pending Queue ──▶ Release Scheduler ──▶ delivery task ──▶ handler
//!   (serialize,          (FIFO)            (tick per window,     (one POST,
//!    never blocks)                          pops ≤ limit)         detached)
//!
//! shutdown() ───────────────────────────▶ drain queue ──▶ Vec<document>
//! ```
//!
//! 1. **Submission** serializes the document eagerly (encoding failures
//!    surface to the caller immediately) and appends to the queue tail.
//! 2. **Release Scheduler** ticks once per window, starting immediately, and
//!    pops up to `limit` items in FIFO order per tick.
//! 3. **Delivery tasks** run independently; a slow or failed delivery never
//!    blocks the timer or other items. The rate limit bounds how many
//!    deliveries *start* per window, not how many are concurrently in
//!    flight.
//! 4. **Shutdown** stops the scheduler, leaves in-flight deliveries to
//!    finish in the background, and returns the still-queued documents in
//!    submission order.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pacer::{Dispatcher, DispatcherConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     id: u64,
//! }
//!
//! # async fn example() -> pacer::Result<()> {
//! let config =
//!     DispatcherConfig::new(10, Duration::from_secs(1), "https://api.example.com/orders");
//! let dispatcher = Dispatcher::<Order>::new(config)?;
//!
//! dispatcher.submit_with_handler(&Order { id: 1 }, |response| {
//!     println!("delivered with HTTP {}", response.status_code);
//! })?;
//!
//! // Stops the scheduler; anything never released comes back.
//! let undelivered = dispatcher.shutdown()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod transport;

mod dispatcher;
mod queue;
mod scheduler;

pub use client::{ClientConfig, HttpTransport};
pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherStats, ServiceState};
pub use error::{DispatchError, ErrorCategory, Result};
pub use transport::{DeliveryResponse, DeliveryTransport};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

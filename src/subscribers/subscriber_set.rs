//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] — distributes events to multiple subscribers
//! concurrently without blocking the publisher (and therefore without ever
//! blocking an admission decision).
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while
//!   B processes N+5
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//! - **Overflow**: event dropped for that subscriber only,
//!   `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: a slow or panicking subscriber doesn't affect others
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind` to isolate panics: the panic is converted
//! to a `SubscriberPanicked` event and the worker continues with the next
//! event; a panic raised while handling a panic report is not re-published.
//! `AssertUnwindSafe` is used, so a subscriber that panics while
//! holding shared state (e.g. a poisoned `Mutex`) is its own problem.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber queue handle.
struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
///
/// Manages per-subscriber queues and worker tasks:
/// - **Concurrent delivery**: events offered to all subscribers at once
/// - **Isolation**: each subscriber has a dedicated queue and worker
/// - **Panic safety**: panics caught and reported, never crash the process
/// - **Overflow handling**: dropped events reported via `SubscriberOverflow`
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Each subscriber gets a bounded mpsc queue (capacity from
    /// [`Subscribe::queue_capacity`], clamped ≥ 1) and a dedicated worker
    /// that runs until the queue closes. Must be called within a Tokio
    /// runtime.
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subscribers.len());
        let mut workers = Vec::with_capacity(subscribers.len());

        for sub in subscribers {
            let capacity = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(capacity);
            workers.push(spawn_worker(sub, rx, bus.clone()));
            lanes.push(Lane { name, tx });
        }

        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers (clones into an `Arc`).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// Uses `try_send`: on a full or closed queue the event is dropped for
    /// that subscriber and a `SubscriberOverflow` is published. Overflow
    /// events that themselves overflow are not re-published, so a saturated
    /// subscriber cannot feed itself an event storm.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for lane in &self.lanes {
            match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_overflow_evt {
                        self.bus.publish(Event::subscriber_overflow(lane.name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_overflow_evt {
                        self.bus
                            .publish(Event::subscriber_overflow(lane.name, "closed"));
                    }
                }
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops all queue senders (workers drain what is already queued, then
    /// see the channel closed) and awaits every worker task.
    pub async fn shutdown(self) {
        drop(self.lanes);

        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Runs one subscriber's delivery loop with panic isolation.
fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let delivery = sub.on_event(ev.as_ref());

            if let Err(panic_err) = std::panic::AssertUnwindSafe(delivery).catch_unwind().await {
                // A panic while handling a panic report is not re-published,
                // so a subscriber that panics on everything cannot feed
                // itself an event storm.
                if ev.kind == EventKind::SubscriberPanicked {
                    continue;
                }
                let info = {
                    let any = &*panic_err;
                    if let Some(msg) = any.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = any.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    }
                };
                bus.publish(Event::subscriber_panicked(sub.name(), info));
            }
        }
    })
}

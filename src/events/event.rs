//! # Admission events emitted by the gate.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Admission events**: per-request flow (admitted, suspended, resumed,
//!   cancelled, released)
//! - **Gate events**: lifecycle and host-protocol issues (closed, completion
//!   violation)
//! - **Subscriber events**: the fan-out layer reporting on itself (overflow,
//!   panic)
//!
//! The [`Event`] struct carries metadata such as the request path, the
//! matched rule prefix, and the ledger counters after the transition.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use poolgate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Admitted)
//!     .with_path("/app1/soap")
//!     .with_prefix("/app1")
//!     .with_active(3)
//!     .with_total(7);
//!
//! assert_eq!(ev.kind, EventKind::Admitted);
//! assert_eq!(ev.path.as_deref(), Some("/app1/soap"));
//! assert_eq!(ev.active, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of gate events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission events ===
    /// A unit of work was admitted on arrival.
    ///
    /// Sets:
    /// - `path`: request path
    /// - `prefix`: matched rule prefix (absent for unmatched traffic)
    /// - `active`: in-flight count for the bucket after the increment
    /// - `total`: pool-wide in-flight count after the increment
    /// - `reason`: set when the admit bypassed parking (`"inline-policy"`,
    ///   `"gate-closed"`)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Admitted,

    /// A unit of work was parked in the suspension queue.
    ///
    /// Sets:
    /// - `path`: request path
    /// - `prefix`: matched rule prefix
    /// - `waiting`: queue depth after the push
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Suspended,

    /// A suspended unit became admissible during a rescan and was handed a
    /// fresh execution context.
    ///
    /// Sets:
    /// - `path`: request path
    /// - `prefix`: matched rule prefix
    /// - `active`: bucket in-flight count after the increment
    /// - `total`: pool-wide in-flight count after the increment
    /// - `waiting`: queue depth after the removal
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Resumed,

    /// A suspended unit was cancelled before it ran.
    ///
    /// Sets:
    /// - `path`: request path
    /// - `prefix`: matched rule prefix
    /// - `reason`: `"dropped-while-queued"` (caller vanished while parked) or
    ///   `"dropped-at-handoff"` (caller vanished as the resumer admitted it;
    ///   the slot is reclaimed and re-offered)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Cancelled,

    /// An admitted unit completed and released its slot.
    ///
    /// Sets:
    /// - `path`: request path
    /// - `prefix`: matched rule prefix
    /// - `active`: bucket in-flight count after the decrement
    /// - `total`: pool-wide in-flight count after the decrement
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Released,

    // === Gate events ===
    /// The host signalled completion for a bucket with nothing in flight
    /// (a completion it never paired with an admission, or a duplicate).
    /// The signal is ignored; this event is the defensive record of it.
    ///
    /// Sets:
    /// - `path`: request path as given to the completion call
    /// - `prefix`: matched rule prefix
    /// - `reason`: what was violated
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CompletionViolation,

    /// The gate was closed; all queued waiters were failed.
    ///
    /// Sets:
    /// - `waiting`: number of waiters drained and failed
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GateClosed,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop cause
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberPanicked,
}

/// Gate event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Event classification.
    pub kind: EventKind,
    /// Request path the event is about.
    pub path: Option<Arc<str>>,
    /// Matched rule prefix (absent for unmatched traffic).
    pub prefix: Option<Arc<str>>,
    /// Bucket in-flight count after the transition.
    pub active: Option<usize>,
    /// Pool-wide in-flight count after the transition.
    pub total: Option<usize>,
    /// Suspension-queue depth after the transition.
    pub waiting: Option<usize>,
    /// Human-readable reason (violations, cancellation causes, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            path: None,
            prefix: None,
            active: None,
            total: None,
            waiting: None,
            reason: None,
        }
    }

    /// Attaches the request path.
    #[inline]
    pub fn with_path(mut self, path: impl Into<Arc<str>>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches the matched rule prefix.
    #[inline]
    pub fn with_prefix(mut self, prefix: impl Into<Arc<str>>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Attaches the bucket in-flight count.
    #[inline]
    pub fn with_active(mut self, active: usize) -> Self {
        self.active = Some(active);
        self
    }

    /// Attaches the pool-wide in-flight count.
    #[inline]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Attaches the suspension-queue depth.
    #[inline]
    pub fn with_waiting(mut self, waiting: usize) -> Self {
        self.waiting = Some(waiting);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// `true` when this event is an overflow report from the fan-out itself.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::Admitted);
        let b = Event::new(EventKind::Suspended);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::Resumed)
            .with_path("/a/x")
            .with_prefix("/a")
            .with_active(1)
            .with_total(2)
            .with_waiting(0)
            .with_reason("why");
        assert_eq!(ev.path.as_deref(), Some("/a/x"));
        assert_eq!(ev.prefix.as_deref(), Some("/a"));
        assert_eq!(ev.active, Some(1));
        assert_eq!(ev.total, Some(2));
        assert_eq!(ev.waiting, Some(0));
        assert_eq!(ev.reason.as_deref(), Some("why"));
    }

    #[test]
    fn test_overflow_helper_marks_kind() {
        let ev = Event::subscriber_overflow("metrics", "full");
        assert!(ev.is_subscriber_overflow());
        assert!(ev.reason.as_deref().unwrap_or("").contains("metrics"));
    }
}

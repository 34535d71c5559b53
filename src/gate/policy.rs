//! # Suspend policy
//!
//! When the admission decision says "suspend", the gate normally parks the
//! unit of work in the suspension queue and releases its execution context.
//! Some hosts cannot detach a request from the thread carrying it; for them
//! the decision must degrade to a synchronous admit rather than a deadlock.
//!
//! ## Variants
//! - `Park`: detach and queue; the caller awaits a [`Pending`](crate::Pending).
//! - `AdmitInline`: never park; admit synchronously even past the limits.
//!
//! ## Invariants
//! - The decision function itself is identical under both policies; only the
//!   handling of a "suspend" outcome differs.
//! - Under `AdmitInline` the pool-wide count may exceed capacity; each inline
//!   admit is published with `reason="inline-policy"` so the overshoot is
//!   observable.

/// Policy controlling what happens when a unit of work cannot be admitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuspendPolicy {
    /// Park the unit in the suspension queue (FIFO, resumed on release).
    ///
    /// Use when:
    /// - The host can await a continuation without holding a worker thread
    /// - Reservations and ceilings must be enforced strictly
    /// - Example: async HTTP front-end over a bounded blocking pool
    #[default]
    Park,

    /// Admit synchronously instead of parking.
    ///
    /// Use when:
    /// - The host transport has no asynchronous continuation support
    /// - Overshooting a quota is preferable to blocking or dropping work
    /// - Example: legacy synchronous servlet-style integration
    AdmitInline,
}

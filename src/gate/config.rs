//! # Gate configuration.
//!
//! Provides [`GateConfig`] — the settings the host supplies when building a
//! [`Gate`](crate::Gate).
//!
//! The only mandatory fact is the pool capacity: the maximum number of
//! concurrent execution slots the worker pool offers, read once at startup.
//! Hosts whose pool is unbounded or unreported pass a fallback constant of
//! their choosing.

use crate::gate::policy::SuspendPolicy;

/// Configuration for an admission gate.
///
/// ## Field semantics
/// - `capacity`: total concurrent execution slots system-wide (must be > 0;
///   validated by [`GateBuilder::build`](crate::GateBuilder::build))
/// - `suspend_policy`: what to do when a unit cannot be admitted
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors over
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Maximum number of concurrently admitted units pool-wide.
    ///
    /// Percentage ceilings (`max=N%`) and the reservation arithmetic are both
    /// evaluated against this value, captured once at build time.
    pub capacity: usize,

    /// Handling of units the decision function refuses to admit.
    ///
    /// Defaults to [`SuspendPolicy::Park`].
    pub suspend_policy: SuspendPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl GateConfig {
    /// Creates a configuration for a pool of the given capacity, with the
    /// default suspend policy and bus capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            suspend_policy: SuspendPolicy::default(),
            bus_capacity: 1024,
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

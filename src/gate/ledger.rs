//! # Admission ledger: counters, decision function, suspension queue.
//!
//! The synchronous core of the gate. One [`Ledger`] lives behind a single
//! `std::sync::Mutex` in [`Gate`](crate::Gate); every transition (arrival,
//! completion, resume, cancel, close) is a short critical section over it,
//! so the decision always sees a consistent joint snapshot of all counters.
//!
//! ## Buckets
//! Paths are resolved to ledger buckets by the rule table before the lock is
//! taken: bucket `i < rules` is the i-th configured prefix (longest first),
//! bucket `rules` is the shared bucket for unmatched traffic (no floor, no
//! ceiling).
//!
//! ## The decision
//! For a bucket with quota `q`:
//! 1. `active < q.min` → admit (filling the bucket's own floor);
//! 2. `active >= effective_max(q)` → suspend (bucket at its ceiling);
//! 3. `total_active + owed >= capacity` → suspend (the remaining threads are
//!    owed to some other bucket's unmet floor);
//! 4. otherwise → admit.
//!
//! `owed` is the aggregate shortfall `Σ max(0, min − active)` across all
//! configured buckets: rule 3 is what keeps free-for-all traffic from eating
//! the slots another path still needs to reach its guaranteed minimum.
//!
//! ## Invariants
//! - `total_active == Σ active[b]` between transitions;
//! - `0 <= active[b] <= capacity` for every bucket `b` (under `Park`);
//! - queue order is arrival order; entries leave only via grant, cancel, or
//!   close-drain.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::GateError;
use crate::gate::permit::Permit;
use crate::rules::RuleTable;

/// Outcome of the decision function for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Decision {
    /// Proceed now on the current execution context.
    Admit,
    /// Park in the suspension queue (or admit inline, per policy).
    Suspend,
}

/// One suspended unit of work, owned by the queue while it waits.
///
/// The sender is the continuation: the resumer hands a [`Permit`] through it
/// on a grant, or [`GateError::Closed`] when the gate drains on close.
pub(super) struct Waiter {
    pub id: u64,
    pub bucket: usize,
    pub path: Arc<str>,
    pub tx: oneshot::Sender<Result<Permit, GateError>>,
}

/// Shared admission state: per-bucket in-flight counts, the pool-wide count,
/// and the suspension queue. Mutated only under the gate's mutex.
pub(super) struct Ledger {
    capacity: usize,
    /// Floor per bucket; the trailing unmatched bucket is always 0.
    mins: Vec<usize>,
    /// Resolved ceiling per bucket (`max`, or `max_percent` of capacity).
    maxes: Vec<Option<usize>>,
    active: Vec<usize>,
    total_active: usize,
    queue: VecDeque<Waiter>,
    closed: bool,
    next_id: u64,
}

impl Ledger {
    /// Builds the ledger for a validated rule table and a fixed capacity.
    ///
    /// Percentage ceilings are resolved against `capacity` here, once; the
    /// table itself is immutable for the gate's lifetime.
    pub(super) fn new(table: &RuleTable, capacity: usize) -> Self {
        let buckets = table.len() + 1;
        let mut mins = Vec::with_capacity(buckets);
        let mut maxes = Vec::with_capacity(buckets);
        for bucket in 0..buckets {
            let quota = table.quota(bucket);
            mins.push(quota.min);
            maxes.push(quota.effective_max(capacity));
        }

        Self {
            capacity,
            mins,
            maxes,
            active: vec![0; buckets],
            total_active: 0,
            queue: VecDeque::new(),
            closed: false,
            next_id: 0,
        }
    }

    /// Aggregate reservation not yet honored anywhere in the system.
    fn owed(&self) -> usize {
        self.mins
            .iter()
            .zip(&self.active)
            .map(|(min, active)| min.saturating_sub(*active))
            .sum()
    }

    /// The admission decision for one bucket, against the current snapshot.
    pub(super) fn decide(&self, bucket: usize) -> Decision {
        if self.active[bucket] < self.mins[bucket] {
            return Decision::Admit;
        }
        if let Some(max) = self.maxes[bucket] {
            if self.active[bucket] >= max {
                return Decision::Suspend;
            }
        }
        if self.total_active + self.owed() >= self.capacity {
            return Decision::Suspend;
        }
        Decision::Admit
    }

    /// Applies an admission: returns the bucket and pool counts after it.
    pub(super) fn admit(&mut self, bucket: usize) -> (usize, usize) {
        self.active[bucket] += 1;
        self.total_active += 1;
        (self.active[bucket], self.total_active)
    }

    /// Undoes an admission whose hand-off failed (caller vanished).
    pub(super) fn rollback(&mut self, bucket: usize) {
        self.active[bucket] -= 1;
        self.total_active -= 1;
    }

    /// Applies a completion. `None` means the bucket had nothing in flight:
    /// the host violated the completion protocol and the signal is ignored.
    pub(super) fn release(&mut self, bucket: usize) -> Option<(usize, usize)> {
        if self.active[bucket] == 0 {
            return None;
        }
        self.active[bucket] -= 1;
        self.total_active -= 1;
        Some((self.active[bucket], self.total_active))
    }

    /// Appends a waiter; returns its cancellation id and the queue depth.
    pub(super) fn park(
        &mut self,
        bucket: usize,
        path: Arc<str>,
        tx: oneshot::Sender<Result<Permit, GateError>>,
    ) -> (u64, usize) {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(Waiter {
            id,
            bucket,
            path,
            tx,
        });
        (id, self.queue.len())
    }

    /// Removes a waiter by id, out of arrival order. `false` when the entry
    /// already left the queue (granted or drained).
    pub(super) fn cancel(&mut self, id: u64) -> bool {
        match self.queue.iter().position(|w| w.id == id) {
            Some(idx) => {
                self.queue.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Takes the earliest waiter that is admissible right now, applying its
    /// counters, or `None` when nothing in the queue may run.
    ///
    /// The scan visits the whole queue: a capped bucket at the head must not
    /// block unrelated buckets behind it. Called in a loop by the resumer;
    /// admitting one waiter never makes an earlier-skipped one admissible, so
    /// repeated scans preserve arrival order among eligible waiters.
    pub(super) fn next_grant(&mut self) -> Option<Waiter> {
        let idx = self
            .queue
            .iter()
            .position(|w| self.decide(w.bucket) == Decision::Admit)?;
        let waiter = self.queue.remove(idx)?;
        self.admit(waiter.bucket);
        Some(waiter)
    }

    /// Marks the gate closed and empties the queue. Idempotent: returns
    /// `None` when already closed.
    pub(super) fn drain_on_close(&mut self) -> Option<VecDeque<Waiter>> {
        if self.closed {
            return None;
        }
        self.closed = true;
        Some(std::mem::take(&mut self.queue))
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(super) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(super) fn total_active(&self) -> usize {
        self.total_active
    }

    pub(super) fn active(&self, bucket: usize) -> usize {
        self.active[bucket]
    }

    pub(super) fn waiting(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTable;

    fn ledger(rules: &str, capacity: usize) -> (Ledger, RuleTable) {
        let table = RuleTable::parse(rules).unwrap();
        (Ledger::new(&table, capacity), table)
    }

    fn park(ledger: &mut Ledger, bucket: usize) -> u64 {
        let (tx, _rx) = oneshot::channel();
        // Receiver dropped: fine for queue-order tests, the sender is inert.
        let (id, _) = ledger.park(bucket, Arc::from("/x"), tx);
        id
    }

    #[test]
    fn test_floor_admits_under_contention() {
        let (mut ledger, table) = ledger("/a:min=1", 2);
        let unmatched = table.resolve("/other");
        let a = table.resolve("/a/x");

        // Fill the pool with unmatched traffic up to the reserved slot.
        assert_eq!(ledger.decide(unmatched), Decision::Admit);
        ledger.admit(unmatched);
        assert_eq!(ledger.decide(unmatched), Decision::Suspend); // owed=1

        // The floor admit is never blocked by global contention.
        assert_eq!(ledger.decide(a), Decision::Admit);
        ledger.admit(a);
        assert_eq!(ledger.total_active(), 2);
        assert_eq!(ledger.decide(a), Decision::Suspend); // pool full
    }

    #[test]
    fn test_ceiling_suspends_with_idle_pool() {
        let (mut ledger, table) = ledger("/a:min=1;max=1", 8);
        let a = table.resolve("/a/x");

        ledger.admit(a);
        assert_eq!(ledger.decide(a), Decision::Suspend);
        ledger.release(a).unwrap();
        assert_eq!(ledger.decide(a), Decision::Admit);
    }

    #[test]
    fn test_percent_ceiling_resolved_at_build() {
        let (mut ledger, table) = ledger("/a:min=0;max=25%", 8);
        let a = table.resolve("/a/x");

        ledger.admit(a);
        ledger.admit(a);
        assert_eq!(ledger.decide(a), Decision::Suspend); // 25% of 8 = 2
    }

    #[test]
    fn test_release_on_empty_bucket_is_violation() {
        let (mut ledger, table) = ledger("/a:min=1", 2);
        let a = table.resolve("/a/x");

        assert!(ledger.release(a).is_none());
        ledger.admit(a);
        assert_eq!(ledger.release(a), Some((0, 0)));
        assert!(ledger.release(a).is_none());
    }

    #[test]
    fn test_grant_skips_capped_head() {
        let (mut ledger, table) = ledger("/a:min=1;max=1", 2);
        let a = table.resolve("/a/x");
        let unmatched = table.resolve("/b/x");

        ledger.admit(a);
        ledger.admit(unmatched);
        let a_waiter = park(&mut ledger, a); // head, capped
        let u_waiter = park(&mut ledger, unmatched);

        ledger.release(unmatched).unwrap();
        let grant = ledger.next_grant().unwrap();
        assert_eq!(grant.id, u_waiter); // head skipped, no HOL blocking
        assert!(ledger.next_grant().is_none());

        ledger.release(a).unwrap();
        assert_eq!(ledger.next_grant().unwrap().id, a_waiter);
    }

    #[test]
    fn test_grants_follow_arrival_order() {
        let (mut ledger, table) = ledger("/a:min=0", 2);
        let unmatched = table.resolve("/z");

        ledger.admit(unmatched);
        ledger.admit(unmatched);
        let first = park(&mut ledger, unmatched);
        let second = park(&mut ledger, unmatched);
        let third = park(&mut ledger, unmatched);

        ledger.release(unmatched).unwrap();
        assert_eq!(ledger.next_grant().unwrap().id, first);
        assert!(ledger.next_grant().is_none());

        ledger.release(unmatched).unwrap();
        assert_eq!(ledger.next_grant().unwrap().id, second);

        ledger.release(unmatched).unwrap();
        assert_eq!(ledger.next_grant().unwrap().id, third);
    }

    #[test]
    fn test_cancel_removes_out_of_order() {
        let (mut ledger, table) = ledger("/a:min=0", 1);
        let unmatched = table.resolve("/z");

        ledger.admit(unmatched);
        let first = park(&mut ledger, unmatched);
        let second = park(&mut ledger, unmatched);

        assert!(ledger.cancel(first));
        assert!(!ledger.cancel(first));
        assert_eq!(ledger.waiting(), 1);

        ledger.release(unmatched).unwrap();
        assert_eq!(ledger.next_grant().unwrap().id, second);
    }

    #[test]
    fn test_drain_on_close_is_idempotent() {
        let (mut ledger, table) = ledger("/a:min=0", 1);
        let unmatched = table.resolve("/z");

        ledger.admit(unmatched);
        park(&mut ledger, unmatched);
        park(&mut ledger, unmatched);

        let drained = ledger.drain_on_close().unwrap();
        assert_eq!(drained.len(), 2);
        assert!(ledger.is_closed());
        assert!(ledger.drain_on_close().is_none());
        assert_eq!(ledger.waiting(), 0);
    }

    #[test]
    fn test_rollback_restores_counts() {
        let (mut ledger, table) = ledger("/a:min=1", 2);
        let a = table.resolve("/a/x");

        ledger.admit(a);
        ledger.rollback(a);
        assert_eq!(ledger.active(a), 0);
        assert_eq!(ledger.total_active(), 0);
    }
}

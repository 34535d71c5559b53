//! # The gate: host-facing admission controller.
//!
//! [`Gate`] owns the ledger, the rule table, and the event plumbing. Hosts
//! interact with three calls on the unit-of-work boundary:
//!
//! - [`Gate::on_arrival`] — the admission decision for one incoming unit;
//! - permit drop / [`Gate::on_completion`] — the completion signal;
//! - [`Gate::close`] — drain the suspension queue at shutdown.
//!
//! ## Construction
//! ```text
//! GateConfig ──► Gate::builder(cfg)
//!                  .with_rules(RuleTable::parse(...)?)   // quota rules
//!                  .with_subscribers(vec![...])          // optional fan-out
//!                  .build()?                             // capacity validator
//! ```
//! `build` refuses to start an unsatisfiable gate: zero capacity or a rule
//! table whose summed minimums exceed the pool.
//!
//! ## Locking
//! Every transition is a short critical section over one `std::sync::Mutex`;
//! nothing async happens while it is held, and completion runs from
//! synchronous `Drop`. Events are created under the lock (so sequence
//! numbers follow transition order) and published after it is released.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::error::GateError;
use crate::events::{Bus, Event, EventKind};
use crate::gate::config::GateConfig;
use crate::gate::ledger::{Decision, Ledger};
use crate::gate::permit::{Admission, Pending, Permit};
use crate::gate::policy::SuspendPolicy;
use crate::rules::{Quota, RuleTable};
use crate::subscribers::{Subscribe, SubscriberSet};

/// State shared between the gate and every outstanding permit/pending.
pub(super) struct Shared {
    table: RuleTable,
    policy: SuspendPolicy,
    bus: Bus,
    ledger: Mutex<Ledger>,
}

impl Shared {
    /// Locks the ledger, ignoring poison: the critical sections never run
    /// user code, and a counter snapshot is still coherent after a panic
    /// elsewhere.
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(super) fn on_arrival(this: &Arc<Self>, path: &str) -> Admission {
        let bucket = this.table.resolve(path);
        let path: Arc<str> = Arc::from(path);

        let mut ledger = this.ledger();
        if ledger.is_closed() {
            return Self::admit_locked(this, ledger, bucket, path, Some("gate-closed"));
        }
        match ledger.decide(bucket) {
            Decision::Admit => Self::admit_locked(this, ledger, bucket, path, None),
            Decision::Suspend => match this.policy {
                SuspendPolicy::AdmitInline => {
                    Self::admit_locked(this, ledger, bucket, path, Some("inline-policy"))
                }
                SuspendPolicy::Park => {
                    let (tx, rx) = oneshot::channel();
                    let (id, waiting) = ledger.park(bucket, Arc::clone(&path), tx);
                    let event = this
                        .event(EventKind::Suspended, bucket, &path)
                        .with_waiting(waiting);
                    drop(ledger);

                    this.bus.publish(event);
                    Admission::Suspended(Pending::new(Arc::clone(this), id, bucket, path, rx))
                }
            },
        }
    }

    fn admit_locked(
        this: &Arc<Self>,
        mut ledger: MutexGuard<'_, Ledger>,
        bucket: usize,
        path: Arc<str>,
        reason: Option<&'static str>,
    ) -> Admission {
        let (active, total) = ledger.admit(bucket);
        let mut event = this
            .event(EventKind::Admitted, bucket, &path)
            .with_active(active)
            .with_total(total);
        if let Some(reason) = reason {
            event = event.with_reason(reason);
        }
        drop(ledger);

        this.bus.publish(event);
        Admission::Admitted(Permit::new(Arc::clone(this), bucket, path))
    }

    /// The completion signal: decrement, then re-offer the freed capacity to
    /// the suspension queue. Called from permit drops and `on_completion`.
    pub(super) fn complete(this: &Arc<Self>, bucket: usize, path: Arc<str>) {
        let mut ledger = this.ledger();
        let mut events = Vec::new();
        match ledger.release(bucket) {
            Some((active, total)) => {
                events.push(
                    this.event(EventKind::Released, bucket, &path)
                        .with_active(active)
                        .with_total(total),
                );
                Self::drain_locked(this, &mut ledger, &mut events);
            }
            None => {
                events.push(
                    this.event(EventKind::CompletionViolation, bucket, &path)
                        .with_reason("no in-flight work for bucket"),
                );
            }
        }
        drop(ledger);

        for event in events {
            this.bus.publish(event);
        }
    }

    /// Resumes every waiter that is admissible now, in arrival order.
    ///
    /// A hand-off fails only when the waiter's caller vanished after the
    /// queue entry was taken; the grant is then rolled back in place and the
    /// scan continues, so the slot goes to the next eligible waiter instead
    /// of leaking.
    fn drain_locked(this: &Arc<Self>, ledger: &mut Ledger, events: &mut Vec<Event>) {
        while let Some(waiter) = ledger.next_grant() {
            let active = ledger.active(waiter.bucket);
            let total = ledger.total_active();
            let waiting = ledger.waiting();
            let permit = Permit::new(Arc::clone(this), waiter.bucket, Arc::clone(&waiter.path));

            match waiter.tx.send(Ok(permit)) {
                Ok(()) => {
                    events.push(
                        this.event(EventKind::Resumed, waiter.bucket, &waiter.path)
                            .with_active(active)
                            .with_total(total)
                            .with_waiting(waiting),
                    );
                }
                Err(returned) => {
                    if let Ok(mut permit) = returned {
                        permit.disarm();
                    }
                    ledger.rollback(waiter.bucket);
                    events.push(
                        this.event(EventKind::Cancelled, waiter.bucket, &waiter.path)
                            .with_reason("dropped-at-handoff"),
                    );
                }
            }
        }
    }

    /// Removes a parked waiter out of arrival order. `false` when the entry
    /// already left the queue (granted or drained by close).
    pub(super) fn cancel_waiter(&self, id: u64, bucket: usize, path: &Arc<str>) -> bool {
        let mut ledger = self.ledger();
        if !ledger.cancel(id) {
            return false;
        }
        let event = self
            .event(EventKind::Cancelled, bucket, path)
            .with_reason("dropped-while-queued");
        drop(ledger);

        self.bus.publish(event);
        true
    }

    /// Takes back a slot whose hand-off succeeded but whose caller dropped
    /// the continuation before running, and re-offers it to the queue.
    pub(super) fn reclaim(this: &Arc<Self>, bucket: usize, path: Arc<str>) {
        let mut ledger = this.ledger();
        let mut events = Vec::new();
        if ledger.release(bucket).is_some() {
            events.push(
                this.event(EventKind::Cancelled, bucket, &path)
                    .with_reason("dropped-at-handoff"),
            );
            Self::drain_locked(this, &mut ledger, &mut events);
        }
        drop(ledger);

        for event in events {
            this.bus.publish(event);
        }
    }

    fn close(&self) {
        let mut ledger = self.ledger();
        let Some(waiters) = ledger.drain_on_close() else {
            return;
        };
        let waiting = waiters.len();
        drop(ledger);

        for waiter in waiters {
            let _ = waiter.tx.send(Err(GateError::Closed));
        }
        self.bus.publish(Event::new(EventKind::GateClosed).with_waiting(waiting));
    }

    fn snapshot(&self) -> GateSnapshot {
        let ledger = self.ledger();
        let rules = self
            .table
            .iter()
            .enumerate()
            .map(|(bucket, (prefix, quota))| RuleSnapshot {
                prefix: Arc::from(prefix),
                quota: *quota,
                active: ledger.active(bucket),
            })
            .collect();

        GateSnapshot {
            capacity: ledger.capacity(),
            total_active: ledger.total_active(),
            waiting: ledger.waiting(),
            unmatched_active: ledger.active(self.table.len()),
            rules,
        }
    }

    fn event(&self, kind: EventKind, bucket: usize, path: &Arc<str>) -> Event {
        let mut event = Event::new(kind).with_path(Arc::clone(path));
        if let Some(prefix) = self.table.prefix(bucket) {
            event = event.with_prefix(prefix);
        }
        event
    }
}

/// Subscriber fan-out plumbing, present only when subscribers were attached.
struct Fanout {
    stop_tx: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

/// Per-path admission controller over a bounded worker pool.
///
/// See the [crate docs](crate) for the full picture. Cheap operations,
/// callable from any thread; the gate itself is `Send + Sync`.
pub struct Gate {
    shared: Arc<Shared>,
    fanout: Option<Fanout>,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").finish_non_exhaustive()
    }
}

impl Gate {
    /// Starts building a gate for the given configuration.
    pub fn builder(cfg: GateConfig) -> GateBuilder {
        GateBuilder::new(cfg)
    }

    /// The admission decision for one incoming unit of work.
    ///
    /// Never an error: the outcome is either a [`Permit`] to proceed now or
    /// a [`Pending`] continuation that resolves when capacity frees up.
    /// After [`close`](Gate::close), arrivals are admitted inline (nothing
    /// would ever drain a queue that no longer rescans).
    pub fn on_arrival(&self, path: &str) -> Admission {
        Shared::on_arrival(&self.shared, path)
    }

    /// Manual completion signal for hosts that cannot carry a [`Permit`]
    /// through their completion path (pair with [`Permit::forget`]).
    ///
    /// The path is resolved through the same rule matcher as the arrival; a
    /// completion for a bucket with nothing in flight is a host protocol
    /// violation, published as a
    /// [`CompletionViolation`](EventKind::CompletionViolation) event and
    /// otherwise ignored.
    pub fn on_completion(&self, path: &str) {
        let bucket = self.shared.table.resolve(path);
        Shared::complete(&self.shared, bucket, Arc::from(path));
    }

    /// Closes the gate: every parked waiter resolves to
    /// [`GateError::Closed`], and subsequent arrivals are admitted inline.
    /// Idempotent.
    pub fn close(&self) {
        self.shared.close();
    }

    /// One consistent read of the ledger, for admin dumps and assertions.
    pub fn snapshot(&self) -> GateSnapshot {
        self.shared.snapshot()
    }

    /// Subscribes to the event stream (admissions, suspensions, resumes,
    /// releases, violations). Independent of the subscriber fan-out.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Closes the gate and gracefully stops the subscriber fan-out,
    /// delivering already-buffered events first.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(fanout) = self.fanout.take() {
            let _ = fanout.stop_tx.send(());
            let _ = fanout.worker.await;
        }
    }
}

/// Builder for constructing a [`Gate`].
pub struct GateBuilder {
    cfg: GateConfig,
    rules: RuleTable,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl GateBuilder {
    /// Creates a builder with an empty rule table and no subscribers.
    pub fn new(cfg: GateConfig) -> Self {
        Self {
            cfg,
            rules: RuleTable::default(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the quota rules. Without rules the gate degenerates to a pure
    /// pool-capacity limiter.
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    /// Attaches event subscribers, each driven by a dedicated worker with a
    /// bounded queue. Requires a Tokio runtime at `build` time when
    /// non-empty.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runs the capacity validator and assembles the gate.
    ///
    /// Fails with [`GateError::InvalidCapacity`] for a zero-capacity pool
    /// and [`GateError::UnsatisfiableReservation`] when the summed minimum
    /// reservations exceed capacity. Hosts treat both as refuse-to-start.
    pub fn build(self) -> Result<Gate, GateError> {
        if self.cfg.capacity == 0 {
            return Err(GateError::InvalidCapacity);
        }
        self.rules.validate(self.cfg.capacity)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let ledger = Ledger::new(&self.rules, self.cfg.capacity);
        let shared = Arc::new(Shared {
            table: self.rules,
            policy: self.cfg.suspend_policy,
            bus: bus.clone(),
            ledger: Mutex::new(ledger),
        });

        let fanout = if self.subscribers.is_empty() {
            None
        } else {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            let (stop_tx, stop_rx) = oneshot::channel();
            Some(Fanout {
                stop_tx,
                worker: spawn_fanout(bus.subscribe(), subs, stop_rx),
            })
        };

        Ok(Gate { shared, fanout })
    }
}

/// Forwards bus events into the subscriber set until stopped (or until the
/// gate is dropped), then drains the buffer and shuts the lanes down.
fn spawn_fanout(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    mut stop_rx: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                recv = rx.recv() => match recv {
                    Ok(event) => subs.emit_arc(Arc::new(event)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        while let Ok(event) = rx.try_recv() {
            subs.emit_arc(Arc::new(event));
        }
        subs.shutdown().await;
    })
}

/// Point-in-time view of the ledger, taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Total pool capacity the gate was built with.
    pub capacity: usize,
    /// Pool-wide in-flight count.
    pub total_active: usize,
    /// Suspension-queue depth.
    pub waiting: usize,
    /// In-flight count of the shared bucket for unmatched traffic.
    pub unmatched_active: usize,
    /// Per-rule state, longest prefix first.
    pub rules: Vec<RuleSnapshot>,
}

/// One configured rule inside a [`GateSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSnapshot {
    /// The configured path prefix.
    pub prefix: Arc<str>,
    /// The quota attached to it.
    pub quota: Quota,
    /// In-flight count for the prefix's bucket.
    pub active: usize,
}

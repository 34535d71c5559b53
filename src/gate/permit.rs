//! # Admission outcomes: permits and suspended continuations.
//!
//! [`Gate::on_arrival`](crate::Gate::on_arrival) returns an [`Admission`]:
//! either the unit of work may proceed now ([`Permit`]) or it was parked in
//! the suspension queue ([`Pending`]).
//!
//! ## Completion protocol
//! A [`Permit`] is the witness of one admitted unit. Dropping it (or calling
//! [`Permit::release`]) signals completion exactly once: the ledger is
//! decremented and the suspension queue is rescanned. Hosts that must signal
//! completion through a side channel instead call [`Permit::forget`] and pair
//! the admission with [`Gate::on_completion`](crate::Gate::on_completion).
//!
//! ## Suspension
//! [`Pending`] is a future resolving to `Result<Permit, GateError>` once the
//! resumer admits the waiter; awaiting it holds no worker thread. Dropping a
//! `Pending` before it resolves cancels the queue entry out of arrival order;
//! if the drop races with the hand-off, the already-applied counters are
//! rolled back and the freed slot is re-offered to the rest of the queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::GateError;
use crate::gate::core::Shared;

/// Witness of one admitted unit of work.
///
/// Not clonable; releases its slot exactly once, on drop.
pub struct Permit {
    shared: Arc<Shared>,
    bucket: usize,
    path: Arc<str>,
    armed: bool,
}

impl Permit {
    pub(super) fn new(shared: Arc<Shared>, bucket: usize, path: Arc<str>) -> Self {
        Self {
            shared,
            bucket,
            path,
            armed: true,
        }
    }

    /// The request path this permit was admitted for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Signals completion and releases the slot.
    ///
    /// Equivalent to dropping the permit; provided for call sites where the
    /// release should be explicit.
    pub fn release(self) {}

    /// Defuses the permit without releasing the slot.
    ///
    /// For hosts using the manual
    /// [`Gate::on_completion`](crate::Gate::on_completion) boundary: the
    /// permit's drop must not also decrement, or the unit would complete
    /// twice.
    pub fn forget(mut self) {
        self.armed = false;
    }

    /// Internal defuse for hand-off failures; the slot is reclaimed by the
    /// caller under the ledger lock.
    pub(super) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        Shared::complete(&self.shared, self.bucket, Arc::clone(&self.path));
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("path", &self.path)
            .field("armed", &self.armed)
            .finish()
    }
}

/// A suspended unit of work: resolves to a [`Permit`] when the resumer
/// admits it, or to [`GateError::Closed`] if the gate closes first.
///
/// Dropping an unresolved `Pending` cancels the suspension (the unit is
/// never admitted). Compose with `tokio::time::timeout` for bounded waits.
#[must_use = "a suspended admission does nothing unless awaited; dropping it cancels the wait"]
pub struct Pending {
    shared: Arc<Shared>,
    id: u64,
    bucket: usize,
    path: Arc<str>,
    rx: oneshot::Receiver<Result<Permit, GateError>>,
    done: bool,
}

impl Pending {
    pub(super) fn new(
        shared: Arc<Shared>,
        id: u64,
        bucket: usize,
        path: Arc<str>,
        rx: oneshot::Receiver<Result<Permit, GateError>>,
    ) -> Self {
        Self {
            shared,
            id,
            bucket,
            path,
            rx,
            done: false,
        }
    }

    /// The request path this suspension is waiting for.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Future for Pending {
    type Output = Result<Permit, GateError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => {
                this.done = true;
                Poll::Ready(outcome)
            }
            // Sender gone without a hand-off: the gate's shared state was
            // torn down while we waited.
            Poll::Ready(Err(_)) => {
                this.done = true;
                Poll::Ready(Err(GateError::Closed))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if self.shared.cancel_waiter(self.id, self.bucket, &self.path) {
            return;
        }
        // The entry already left the queue: either a permit or a close error
        // is sitting in the channel. If a permit made it through, its slot
        // was applied and must be reclaimed for the rest of the queue.
        self.rx.close();
        if let Ok(Ok(mut permit)) = self.rx.try_recv() {
            permit.disarm();
            Shared::reclaim(&self.shared, self.bucket, Arc::clone(&self.path));
        }
    }
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("path", &self.path)
            .field("done", &self.done)
            .finish()
    }
}

/// Outcome of [`Gate::on_arrival`](crate::Gate::on_arrival).
#[derive(Debug)]
pub enum Admission {
    /// Proceed now on the current execution context.
    Admitted(Permit),
    /// Parked; await the contained future for a fresh execution context.
    Suspended(Pending),
}

impl Admission {
    /// `true` when the unit may proceed immediately.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    /// Waits out a suspension, collapsing both outcomes into a permit.
    ///
    /// Hosts that can await unconditionally use this instead of matching:
    /// an immediate admission resolves without yielding.
    pub async fn resolve(self) -> Result<Permit, GateError> {
        match self {
            Admission::Admitted(permit) => Ok(permit),
            Admission::Suspended(pending) => pending.await,
        }
    }
}

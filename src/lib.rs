//! # poolgate
//!
//! **Poolgate** is a per-path admission-control layer for bounded worker
//! pools.
//!
//! It sits in front of a shared pool that serves many logical applications
//! multiplexed by request path prefix, and guarantees that a traffic burst to
//! one application can never starve another application out of its promised
//! minimum share of capacity — while optionally capping any single
//! application below a ceiling. Work that cannot run right now is *suspended*
//! (parked without a thread) and *resumed* in arrival order as capacity
//! frees up.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   "/app1:min=5;max=10%, /app2:min=2"        capacity (from the pool)
//!            │                                        │
//!            ▼                                        ▼
//!       ┌──────────┐   validate (Σ min ≤ cap)   ┌───────────┐
//!       │ RuleTable│ ───────────────────────────► GateBuilder│──► Gate
//!       └──────────┘                            └───────────┘
//!
//!   on_arrival(path)
//!       │ longest-prefix match → bucket
//!       ▼
//! ┌─ Ledger (one mutex: consistent joint snapshot) ─────────────┐
//! │ 1. active(p) < min(p)            → admit   (floor)          │
//! │ 2. active(p) ≥ effective_max(p)  → suspend (ceiling)        │
//! │ 3. total + owed ≥ capacity       → suspend (reservation)    │
//! │ 4. otherwise                     → admit                    │
//! └──────────────────────────────────────────────────────────────┘
//!       │                                │
//!       ▼                                ▼
//!  Admitted(Permit)              Suspended(Pending) ──► FIFO queue
//!       │                                                   ▲
//!       │ drop / release()                                  │
//!       ▼                                                   │
//!  decrement ──► rescan whole queue, resume in arrival order┘
//!
//!  every transition ──► Bus (broadcast) ──► Gate::events() receivers
//!                                       └─► SubscriberSet (per-sub queues)
//! ```
//!
//! ### Lifecycle
//! ```text
//! RuleTable::parse(cfg) ──► Gate::builder(GateConfig::new(capacity))
//!                              .with_rules(table)
//!                              .with_subscribers(subs)
//!                              .build()?          // refuse-to-start checks
//!
//! per request {
//!   ├─► match gate.on_arrival(path)
//!   │     ├─ Admitted(permit)   ─► run the work, drop(permit) on any exit
//!   │     └─ Suspended(pending) ─► permit = pending.await?   (no thread held)
//!   │                              run the work, drop(permit)
//!   └─► drop(permit) ─► ledger decrement ─► resume scan
//! }
//!
//! shutdown: gate.shutdown().await
//!   ├─► close(): queued waiters resolve Err(Closed), GateClosed published
//!   └─► subscriber fan-out drained and stopped
//! ```
//!
//! ## Features
//! | Area            | Description                                                          | Key types / traits                     |
//! |-----------------|----------------------------------------------------------------------|----------------------------------------|
//! | **Rules**       | Parse quota rules, longest-prefix matching, startup validation.      | [`RuleTable`], [`Quota`]               |
//! | **Admission**   | The per-arrival decision and the RAII completion protocol.           | [`Gate`], [`Admission`], [`Permit`]    |
//! | **Suspension**  | Thread-free parking with FIFO resume and out-of-order cancel.        | [`Pending`], [`SuspendPolicy`]         |
//! | **Events**      | Every transition observable on a broadcast bus.                      | [`Event`], [`EventKind`], [`Bus`]      |
//! | **Subscribers** | Non-blocking fan-out to host handlers (logging, metrics, alerts).    | [`Subscribe`], [`SubscriberSet`]       |
//! | **Errors**      | Typed refuse-to-start and close errors.                              | [`ConfigError`], [`GateError`]         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use poolgate::{Admission, Gate, GateConfig, RuleTable};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // "/app1" always gets 1 slot; nobody may take more than half the pool.
//!     let rules = RuleTable::parse("/app1:min=1;max=50%, /app2:min=1;max=50%")?;
//!     let gate = Gate::builder(GateConfig::new(4)).with_rules(rules).build()?;
//!
//!     match gate.on_arrival("/app1/soap") {
//!         Admission::Admitted(permit) => {
//!             // ... do the work on this execution context ...
//!             permit.release();
//!         }
//!         Admission::Suspended(pending) => {
//!             // No worker thread is held while this waits.
//!             let permit = pending.await?;
//!             // ... resumed on a fresh execution context ...
//!             permit.release();
//!         }
//!     }
//!
//!     gate.shutdown().await;
//!     Ok(())
//! }
//! ```

mod error;
mod events;
mod gate;
mod rules;
mod subscribers;

// ---- Public re-exports ----

pub use error::{ConfigError, GateError};
pub use events::{Bus, Event, EventKind};
pub use gate::{
    Admission, Gate, GateBuilder, GateConfig, GateSnapshot, Pending, Permit, RuleSnapshot,
    SuspendPolicy,
};
pub use rules::{Quota, RuleTable};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

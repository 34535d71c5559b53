//! Admission gate: ledger, decision function, suspend/resume.
//!
//! The runtime half of the crate. The [`rules`](crate::RuleTable) module
//! decides *which* quota applies to a request; this module decides *whether*
//! the request may run right now, and parks it without a thread when it may
//! not:
//!
//! ```text
//! on_arrival(path)
//!     │  resolve bucket (rule table)
//!     ▼
//! ┌─ Ledger (one mutex) ────────────────────────────────┐
//! │ 1. active < min            → admit (floor)          │
//! │ 2. active ≥ effective max  → suspend (ceiling)      │
//! │ 3. total + owed ≥ capacity → suspend (reservation)  │
//! │ 4. otherwise               → admit                  │
//! └─────────────────────────────────────────────────────┘
//!     │                         │
//!     ▼                         ▼
//! Admitted(Permit)         Suspended(Pending) ──► FIFO queue
//!     │ drop = completion                            ▲
//!     ▼                                              │ rescan in
//! release + rescan ──────────────────────────────────┘ arrival order
//! ```
//!
//! Internal modules:
//! - [`config`]: [`GateConfig`];
//! - [`policy`]: [`SuspendPolicy`], the fail-safe for detach-less hosts;
//! - [`ledger`]: counters, decision function, suspension queue (sync core);
//! - [`permit`]: [`Permit`], [`Pending`], [`Admission`];
//! - [`core`]: [`Gate`], [`GateBuilder`], snapshots, event plumbing.

mod config;
mod core;
mod ledger;
mod permit;
mod policy;

pub use config::GateConfig;
pub use core::{Gate, GateBuilder, GateSnapshot, RuleSnapshot};
pub use permit::{Admission, Pending, Permit};
pub use policy::SuspendPolicy;

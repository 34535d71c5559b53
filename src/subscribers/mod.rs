//! # Event subscribers for the gate.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out that delivers gate events to host-supplied handlers without ever
//! blocking an admission decision.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Gate ── publish(Event) ──► Bus ──► fan-out worker
//!                                          │
//!                                          ▼
//!                                    SubscriberSet.emit_arc()
//!                                     ┌────┴────┬─────────┐
//!                                     ▼         ▼         ▼
//!                                  LogWriter  Metrics  Custom...
//!                                  (queue +   (queue +  (queue +
//!                                   worker)    worker)   worker)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use poolgate::{Event, EventKind, Subscribe};
//!
//! struct SuspendAlert;
//!
//! #[async_trait]
//! impl Subscribe for SuspendAlert {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::Suspended {
//!             // page someone, bump a gauge, ...
//!         }
//!     }
//! }
//! ```

mod embedded;
mod subscribe;
mod subscriber_set;

pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;

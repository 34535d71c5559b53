//! Gate events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the gate on every admission
//! transition.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Gate::on_arrival`, `Gate::on_completion`, permit drops,
//!   the resume scan, `Gate::close`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: receivers from [`Gate::events`](crate::Gate::events), and
//!   the internal forwarder feeding the
//!   [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

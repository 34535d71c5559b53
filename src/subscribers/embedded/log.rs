//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [admitted] path="/app1/soap" prefix="/app1" active=3 total=7
//! [suspended] path="/app1/soap" prefix="/app1" waiting=2
//! [resumed] path="/app1/soap" prefix="/app1" active=3 total=7 waiting=1
//! [released] path="/app2/x" active=0 total=6
//! [cancelled] path="/app1/soap" reason="dropped-while-queued"
//! [completion-violation] path="/ghost" reason="no in-flight work for bucket"
//! [gate-closed] waiting=4
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn fmt_opt(value: &Option<std::sync::Arc<str>>) -> &str {
    value.as_deref().unwrap_or("-")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::Admitted => {
                if let Some(reason) = &e.reason {
                    println!(
                        "[admitted] path={:?} prefix={:?} active={:?} total={:?} reason={reason:?}",
                        fmt_opt(&e.path),
                        fmt_opt(&e.prefix),
                        e.active,
                        e.total,
                    );
                } else {
                    println!(
                        "[admitted] path={:?} prefix={:?} active={:?} total={:?}",
                        fmt_opt(&e.path),
                        fmt_opt(&e.prefix),
                        e.active,
                        e.total,
                    );
                }
            }
            EventKind::Suspended => {
                println!(
                    "[suspended] path={:?} prefix={:?} waiting={:?}",
                    fmt_opt(&e.path),
                    fmt_opt(&e.prefix),
                    e.waiting,
                );
            }
            EventKind::Resumed => {
                println!(
                    "[resumed] path={:?} prefix={:?} active={:?} total={:?} waiting={:?}",
                    fmt_opt(&e.path),
                    fmt_opt(&e.prefix),
                    e.active,
                    e.total,
                    e.waiting,
                );
            }
            EventKind::Cancelled => {
                println!(
                    "[cancelled] path={:?} reason={:?}",
                    fmt_opt(&e.path),
                    fmt_opt(&e.reason),
                );
            }
            EventKind::Released => {
                println!(
                    "[released] path={:?} active={:?} total={:?}",
                    fmt_opt(&e.path),
                    e.active,
                    e.total,
                );
            }
            EventKind::CompletionViolation => {
                println!(
                    "[completion-violation] path={:?} reason={:?}",
                    fmt_opt(&e.path),
                    fmt_opt(&e.reason),
                );
            }
            EventKind::GateClosed => {
                println!("[gate-closed] waiting={:?}", e.waiting);
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] {}", fmt_opt(&e.reason));
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] {}", fmt_opt(&e.reason));
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

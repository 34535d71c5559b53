//! # Demo: logging
//!
//! Runs a handful of concurrent workers through the gate with the built-in
//! [`LogWriter`] subscriber attached, so every admission, suspension, resume
//! and release is printed as it happens.
//!
//! Demonstrates how to:
//! - Attach subscribers via [`GateBuilder::with_subscribers`].
//! - Share a [`Gate`] across tasks and collapse both admission arms with
//!   [`Admission::resolve`].
//! - Shut down cleanly so buffered events still reach the subscriber.
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! cargo run --example logging --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use poolgate::{Gate, GateConfig, LogWriter, RuleTable, Subscribe};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // /app1 keeps one reserved slot and may use at most half the pool.
    let rules = RuleTable::parse("/app1:min=1;max=50%, /app2:min=1")?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let gate = Arc::new(
        Gate::builder(GateConfig::new(2))
            .with_rules(rules)
            .with_subscribers(subs)
            .build()?,
    );

    let paths = [
        "/app1/report",
        "/app2/sync",
        "/app1/export",
        "/other/ping",
        "/app2/sync",
    ];

    let mut workers = Vec::new();
    for path in paths {
        let gate = Arc::clone(&gate);
        workers.push(tokio::spawn(async move {
            // resolve(): run now if admitted, otherwise wait out the parking.
            let permit = gate.on_arrival(path).resolve().await?;
            tokio::time::sleep(Duration::from_millis(50)).await;
            permit.release();
            Ok::<(), poolgate::GateError>(())
        }));
    }

    for worker in workers {
        worker.await??;
    }

    if let Ok(gate) = Arc::try_unwrap(gate) {
        gate.shutdown().await;
    }
    Ok(())
}

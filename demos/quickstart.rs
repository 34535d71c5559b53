//! # Demo: quickstart
//!
//! Minimal walk-through of the admission gate: parse quota rules, build a
//! gate over a two-slot pool, and watch a request get suspended and resumed.
//!
//! Demonstrates how to:
//! - Parse a rule string into a [`RuleTable`].
//! - Build a [`Gate`] with [`GateConfig`] (the capacity validator runs here).
//! - Handle both arms of [`Admission`] and the permit completion protocol.
//!
//! ## Flow
//! ```text
//! RuleTable::parse("/app1:min=1") ──► Gate::builder(cfg).build()?
//!
//! on_arrival("/app1/alpha") ─► Admitted   (slot 1)
//! on_arrival("/app2/beta")  ─► Admitted   (slot 2)
//! on_arrival("/app1/gamma") ─► Suspended  (pool full, parked without a thread)
//! permit2.release()         ─► rescan ──► gamma resumed
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example quickstart
//! ```

use poolgate::{Admission, Gate, GateConfig, RuleTable};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. One reserved slot for /app1; pool of two worker slots total.
    let rules = RuleTable::parse("/app1:min=1")?;
    let gate = Gate::builder(GateConfig::new(2)).with_rules(rules).build()?;

    // 2. Two requests fill the pool.
    let permit1 = match gate.on_arrival("/app1/alpha") {
        Admission::Admitted(permit) => permit,
        Admission::Suspended(_) => unreachable!("pool is empty"),
    };
    println!("[quickstart] admitted: {}", permit1.path());

    let permit2 = match gate.on_arrival("/app2/beta") {
        Admission::Admitted(permit) => permit,
        Admission::Suspended(_) => unreachable!("one slot still free"),
    };
    println!("[quickstart] admitted: {}", permit2.path());

    // 3. A third request finds the pool saturated and is parked.
    let pending = match gate.on_arrival("/app1/gamma") {
        Admission::Admitted(_) => unreachable!("pool is full"),
        Admission::Suspended(pending) => pending,
    };
    println!("[quickstart] suspended: {} (waiting={})", pending.path(), gate.snapshot().waiting);

    // 4. Completing any admitted unit resumes the waiter in arrival order.
    permit2.release();
    let permit3 = pending.await?;
    println!("[quickstart] resumed: {}", permit3.path());

    permit3.release();
    permit1.release();
    println!("[quickstart] drained: total_active={}", gate.snapshot().total_active);

    gate.shutdown().await;
    Ok(())
}

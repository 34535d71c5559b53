//! End-to-end gate scenarios: suspend/resume, reservation floors, ceilings,
//! fairness, cancellation, close, and host-protocol violations.
//!
//! Resumption happens synchronously inside the releasing permit's drop, so
//! these tests poll pendings directly (`futures::poll!`) instead of sleeping:
//! every assertion is deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use poolgate::{
    Admission, Event, EventKind, Gate, GateConfig, GateError, Pending, Permit, RuleTable,
    Subscribe, SuspendPolicy,
};

fn gate(rules: &str, capacity: usize) -> Gate {
    let table = RuleTable::parse(rules).expect("valid rules");
    Gate::builder(GateConfig::new(capacity))
        .with_rules(table)
        .build()
        .expect("valid gate")
}

fn admitted(admission: Admission) -> Permit {
    match admission {
        Admission::Admitted(permit) => permit,
        Admission::Suspended(_) => panic!("expected an immediate admission"),
    }
}

fn suspended(admission: Admission) -> Pending {
    match admission {
        Admission::Admitted(_) => panic!("expected a suspension"),
        Admission::Suspended(pending) => pending,
    }
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    // Capacity 2, one rule reserving a slot for /app1.
    let gate = gate("/app1:min=1", 2);

    let request1 = admitted(gate.on_arrival("/app1/x"));
    let request3 = admitted(gate.on_arrival("/app2/y"));

    // Both slots busy: the second /app1 request never reaches the handler.
    let mut request2 = suspended(gate.on_arrival("/app1/y"));
    assert!(futures::poll!(&mut request2).is_pending());

    let snap = gate.snapshot();
    assert_eq!(snap.total_active, 2);
    assert_eq!(snap.waiting, 1);

    // Any completion frees it.
    request3.release();
    let permit = match futures::poll!(&mut request2) {
        std::task::Poll::Ready(Ok(permit)) => permit,
        other => panic!("expected resumption, got {other:?}"),
    };
    assert_eq!(permit.path(), "/app1/y");

    drop(permit);
    request1.release();
    let snap = gate.snapshot();
    assert_eq!(snap.total_active, 0);
    assert_eq!(snap.waiting, 0);
}

#[tokio::test]
async fn test_reservation_floor_is_never_starved() {
    // One slot of the two is permanently owed to /a until /a uses it.
    let gate = gate("/a:min=1", 2);

    let unmatched1 = admitted(gate.on_arrival("/z1"));
    let mut unmatched2 = suspended(gate.on_arrival("/z2"));

    // The floor admit goes through even with the pool otherwise saturated.
    let a1 = admitted(gate.on_arrival("/a/x"));
    assert_eq!(gate.snapshot().total_active, 2);

    // Releasing /a's slot re-opens the debt: unmatched traffic stays parked.
    a1.release();
    assert!(futures::poll!(&mut unmatched2).is_pending());

    // Only a free-for-all slot resumes free-for-all traffic.
    unmatched1.release();
    assert!(matches!(
        futures::poll!(&mut unmatched2),
        std::task::Poll::Ready(Ok(_))
    ));
}

#[tokio::test]
async fn test_ceiling_blocks_even_when_pool_is_idle() {
    let gate = gate("/a:min=1;max=1", 4);

    let a1 = admitted(gate.on_arrival("/a/x"));
    let mut a2 = suspended(gate.on_arrival("/a/y"));

    // Plenty of pool capacity left for everyone else.
    let _u = admitted(gate.on_arrival("/other"));

    a1.release();
    assert!(matches!(
        futures::poll!(&mut a2),
        std::task::Poll::Ready(Ok(_))
    ));
}

#[tokio::test]
async fn test_percent_ceiling_against_startup_capacity() {
    // 20% of 10 slots = 2 concurrent units.
    let gate = gate("/a:min=0;max=20%", 10);

    let a1 = admitted(gate.on_arrival("/a/1"));
    let _a2 = admitted(gate.on_arrival("/a/2"));
    let mut a3 = suspended(gate.on_arrival("/a/3"));

    a1.release();
    assert!(matches!(
        futures::poll!(&mut a3),
        std::task::Poll::Ready(Ok(_))
    ));
}

#[tokio::test]
async fn test_capped_head_does_not_block_unrelated_waiters() {
    let gate = gate("/a:min=1;max=1", 2);

    let a1 = admitted(gate.on_arrival("/a/x"));
    let mut a2 = suspended(gate.on_arrival("/a/y")); // head of queue, capped
    let u1 = admitted(gate.on_arrival("/z1"));
    let mut u2 = suspended(gate.on_arrival("/z2"));

    // Freeing a generic slot resumes the unmatched waiter behind the capped
    // head; the head itself stays parked at its ceiling.
    u1.release();
    assert!(futures::poll!(&mut a2).is_pending());
    assert!(matches!(
        futures::poll!(&mut u2),
        std::task::Poll::Ready(Ok(_))
    ));

    a1.release();
    assert!(matches!(
        futures::poll!(&mut a2),
        std::task::Poll::Ready(Ok(_))
    ));
}

#[tokio::test]
async fn test_resumption_order_is_arrival_order() {
    // No rules: a pure pool-capacity limiter.
    let gate = gate("min=0", 2);

    let u1 = admitted(gate.on_arrival("/p1"));
    let u2 = admitted(gate.on_arrival("/p2"));
    let mut w3 = suspended(gate.on_arrival("/p3"));
    let mut w4 = suspended(gate.on_arrival("/p4"));
    let mut w5 = suspended(gate.on_arrival("/p5"));

    u1.release();
    let p3 = match futures::poll!(&mut w3) {
        std::task::Poll::Ready(Ok(permit)) => permit,
        other => panic!("expected w3 first, got {other:?}"),
    };
    assert!(futures::poll!(&mut w4).is_pending());
    assert!(futures::poll!(&mut w5).is_pending());

    u2.release();
    let p4 = match futures::poll!(&mut w4) {
        std::task::Poll::Ready(Ok(permit)) => permit,
        other => panic!("expected w4 second, got {other:?}"),
    };
    assert!(futures::poll!(&mut w5).is_pending());

    p3.release();
    assert!(matches!(
        futures::poll!(&mut w5),
        std::task::Poll::Ready(Ok(_))
    ));
    p4.release();
}

#[tokio::test]
async fn test_dropped_pending_is_never_admitted() {
    let gate = gate("min=0", 1);

    let u1 = admitted(gate.on_arrival("/p1"));
    let w2 = suspended(gate.on_arrival("/p2"));
    let mut w3 = suspended(gate.on_arrival("/p3"));
    assert_eq!(gate.snapshot().waiting, 2);

    // Caller of the second request disconnects while parked.
    drop(w2);
    assert_eq!(gate.snapshot().waiting, 1);

    // The freed slot goes to the third request, not the cancelled one.
    u1.release();
    let permit = match futures::poll!(&mut w3) {
        std::task::Poll::Ready(Ok(permit)) => permit,
        other => panic!("expected w3 resumed, got {other:?}"),
    };
    assert_eq!(gate.snapshot().total_active, 1);
    permit.release();
}

#[tokio::test]
async fn test_client_disconnect_cancels_suspension() {
    let gate = Arc::new(gate("min=0", 1));
    let _held = admitted(gate.on_arrival("/busy"));

    let pending = suspended(gate.on_arrival("/victim"));
    let disconnect = CancellationToken::new();

    let worker = tokio::spawn({
        let disconnect = disconnect.clone();
        async move {
            tokio::select! {
                _ = disconnect.cancelled() => None,
                outcome = pending => Some(outcome),
            }
        }
    });

    disconnect.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("worker finished")
        .expect("worker did not panic");
    assert!(outcome.is_none(), "disconnected request must not be admitted");
    assert_eq!(gate.snapshot().waiting, 0);
}

#[tokio::test]
async fn test_close_drains_waiters_and_admits_inline() {
    let gate = gate("min=0", 1);
    let mut events = gate.events();

    let _held = admitted(gate.on_arrival("/p1"));
    let mut parked = suspended(gate.on_arrival("/p2"));

    gate.close();
    match futures::poll!(&mut parked) {
        std::task::Poll::Ready(Err(GateError::Closed)) => {}
        other => panic!("expected Closed, got {other:?}"),
    }

    // Arrivals after close bypass the queue.
    let late = admitted(gate.on_arrival("/p3"));
    late.release();

    // Closing again is a no-op.
    gate.close();

    let mut saw_closed = 0;
    while let Ok(event) = events.try_recv() {
        if event.kind == EventKind::GateClosed {
            saw_closed += 1;
            assert_eq!(event.waiting, Some(1));
        }
        if event.kind == EventKind::Admitted && event.path.as_deref() == Some("/p3") {
            assert_eq!(event.reason.as_deref(), Some("gate-closed"));
        }
    }
    assert_eq!(saw_closed, 1);
}

#[tokio::test]
async fn test_admit_inline_policy_never_parks() {
    let table = RuleTable::parse("/a:min=1;max=1").unwrap();
    let mut cfg = GateConfig::new(1);
    cfg.suspend_policy = SuspendPolicy::AdmitInline;
    let gate = Gate::builder(cfg).with_rules(table).build().unwrap();
    let mut events = gate.events();

    let first = gate.on_arrival("/a/1");
    let second = gate.on_arrival("/a/2");
    assert!(first.is_admitted());
    assert!(second.is_admitted());

    // The overshoot is visible in the counters and flagged on the event.
    assert_eq!(gate.snapshot().total_active, 2);
    let mut inline = 0;
    while let Ok(event) = events.try_recv() {
        if event.reason.as_deref() == Some("inline-policy") {
            inline += 1;
        }
    }
    assert_eq!(inline, 1);
}

#[tokio::test]
async fn test_completion_violation_is_reported_not_fatal() {
    let gate = gate("/app1:min=1", 2);
    let mut events = gate.events();

    gate.on_completion("/ghost");

    let event = events.try_recv().expect("violation published");
    assert_eq!(event.kind, EventKind::CompletionViolation);
    assert_eq!(event.path.as_deref(), Some("/ghost"));
    assert_eq!(gate.snapshot().total_active, 0);

    // The gate keeps working afterwards.
    assert!(gate.on_arrival("/app1/x").is_admitted());
}

#[tokio::test]
async fn test_manual_completion_boundary() {
    let gate = gate("/app1:min=1", 2);
    let mut events = gate.events();

    let permit = admitted(gate.on_arrival("/app1/x"));
    permit.forget();
    assert_eq!(gate.snapshot().total_active, 1);

    gate.on_completion("/app1/x");
    assert_eq!(gate.snapshot().total_active, 0);

    // A second completion for the same unit is the host's bug, detected.
    gate.on_completion("/app1/x");
    let mut violations = 0;
    while let Ok(event) = events.try_recv() {
        if event.kind == EventKind::CompletionViolation {
            violations += 1;
        }
    }
    assert_eq!(violations, 1);
}

#[tokio::test]
async fn test_snapshot_tracks_per_rule_state() {
    let gate = gate("/app1:min=1;max=2, /app2:min=1", 4);

    let _a = admitted(gate.on_arrival("/app1/x"));
    let _b = admitted(gate.on_arrival("/app1/y"));
    let _c = admitted(gate.on_arrival("/elsewhere"));

    let snap = gate.snapshot();
    assert_eq!(snap.capacity, 4);
    assert_eq!(snap.total_active, 3);
    assert_eq!(snap.unmatched_active, 1);

    let app1 = snap
        .rules
        .iter()
        .find(|r| r.prefix.as_ref() == "/app1")
        .expect("rule present");
    assert_eq!(app1.active, 2);
    assert_eq!(app1.quota.max, Some(2));

    let total: usize = snap.rules.iter().map(|r| r.active).sum::<usize>() + snap.unmatched_active;
    assert_eq!(total, snap.total_active);
}

struct CountingSubscriber {
    seen: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Subscribe for CountingSubscriber {
    async fn on_event(&self, _event: &Event) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn test_shutdown_delivers_buffered_events_to_subscribers() {
    let seen = Arc::new(AtomicUsize::new(0));
    let table = RuleTable::parse("/app1:min=1").unwrap();
    let gate = Gate::builder(GateConfig::new(2))
        .with_rules(table)
        .with_subscribers(vec![Arc::new(CountingSubscriber {
            seen: Arc::clone(&seen),
        })])
        .build()
        .unwrap();

    let p1 = admitted(gate.on_arrival("/app1/x"));
    let p2 = admitted(gate.on_arrival("/app2/y"));
    p1.release();
    p2.release();

    // 2 admissions + 2 releases + 1 close marker.
    gate.shutdown().await;
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

/// Stalls on every delivery until the semaphore is opened, with the smallest
/// possible queue, so the fan-out must overflow under any burst.
struct StalledSubscriber {
    stall: Arc<Semaphore>,
}

#[async_trait::async_trait]
impl Subscribe for StalledSubscriber {
    async fn on_event(&self, _event: &Event) {
        self.stall
            .acquire()
            .await
            .expect("semaphore stays open")
            .forget();
    }

    fn name(&self) -> &'static str {
        "stalled"
    }

    fn queue_capacity(&self) -> usize {
        1
    }
}

#[tokio::test]
async fn test_slow_subscriber_overflow_is_reported() {
    let stall = Arc::new(Semaphore::new(0));
    let table = RuleTable::parse("/app1:min=1").unwrap();
    let gate = Gate::builder(GateConfig::new(8))
        .with_rules(table)
        .with_subscribers(vec![Arc::new(StalledSubscriber {
            stall: Arc::clone(&stall),
        })])
        .build()
        .unwrap();
    let mut events = gate.events();

    // More events than the stalled lane can hold: one in delivery, one
    // queued, the rest must be dropped and reported.
    for _ in 0..6 {
        admitted(gate.on_arrival("/app1/x")).release();
    }

    let overflow = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match events.recv().await {
                Ok(event) if event.kind == EventKind::SubscriberOverflow => break event,
                Ok(_) => continue,
                Err(err) => panic!("bus closed before the overflow report: {err}"),
            }
        }
    })
    .await
    .expect("overflow reported");
    assert!(overflow.reason.as_deref().unwrap_or("").contains("stalled"));

    stall.add_permits(64);
    gate.shutdown().await;
}

/// Panics on every delivery, including its own panic reports.
struct FaultySubscriber;

#[async_trait::async_trait]
impl Subscribe for FaultySubscriber {
    async fn on_event(&self, _event: &Event) {
        panic!("subscriber bug");
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

struct ReleaseCounter {
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Subscribe for ReleaseCounter {
    async fn on_event(&self, event: &Event) {
        if event.kind == EventKind::Released {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name(&self) -> &'static str {
        "release-counter"
    }
}

#[tokio::test]
async fn test_panicking_subscriber_is_isolated() {
    let releases = Arc::new(AtomicUsize::new(0));
    let table = RuleTable::parse("/app1:min=1").unwrap();
    let gate = Gate::builder(GateConfig::new(2))
        .with_rules(table)
        .with_subscribers(vec![
            Arc::new(FaultySubscriber),
            Arc::new(ReleaseCounter {
                releases: Arc::clone(&releases),
            }),
        ])
        .build()
        .unwrap();
    let mut events = gate.events();

    admitted(gate.on_arrival("/app1/x")).release();

    let panicked = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match events.recv().await {
                Ok(event) if event.kind == EventKind::SubscriberPanicked => break event,
                Ok(_) => continue,
                Err(err) => panic!("bus closed before the panic report: {err}"),
            }
        }
    })
    .await
    .expect("panic reported");
    assert!(panicked.reason.as_deref().unwrap_or("").contains("faulty"));

    // The faulty lane keeps panicking (even on the panic report, which is
    // swallowed rather than re-published); the healthy lane still sees every
    // later event.
    admitted(gate.on_arrival("/app1/y")).release();
    gate.shutdown().await;
    assert_eq!(releases.load(Ordering::SeqCst), 2);
}

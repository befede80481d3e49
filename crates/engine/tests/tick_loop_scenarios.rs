// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! End-to-end reproductions of the six testable tick-loop scenarios: fair
//! dispatch, budget overflow with yield, `OneRPCPerUpdate`, adaptive
//! controller convergence, stream diffing, and disconnect mid-queue — driven
//! through `Engine::tick()` against the in-memory test doubles rather than
//! unit-testing any one collaborator in isolation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tickrpc_core::{ClientId, Request};
use tickrpc_engine::{AdaptiveControllerConfig, Engine};
use tickrpc_testkit::{ManualClock, MockServiceRegistry, MockTransport};
use tickrpc_transport::{encode_value, Activity, HandleOutcome, Observer};

#[derive(Default)]
struct ActivityRecorder {
    seen: Arc<Mutex<Vec<ClientId>>>,
}

impl Observer for ActivityRecorder {
    fn on_activity(&mut self, activity: Activity) {
        self.seen.lock().push(activity.client);
    }
}

#[test]
fn fair_dispatch_rotates_the_round_robin_head_each_tick() {
    let registry = Arc::new(MockServiceRegistry::new());
    registry.register_immediate("orbit", "ping", serde_json::json!("pong"));
    let clock = Arc::new(ManualClock::new());
    let mut engine = Engine::with_clock(registry.clone(), clock.clone());

    let transport = MockTransport::new();
    let a = transport.add_client(ClientId(1), "a");
    let b = transport.add_client(ClientId(2), "b");
    let c = transport.add_client(ClientId(3), "c");
    engine.attach_rpc_transport(Box::new(transport));

    let seen = Arc::new(Mutex::new(Vec::new()));
    engine.add_observer(Box::new(ActivityRecorder { seen: seen.clone() }));

    let req = Request::new("orbit", "ping", vec![]);
    a.push_request(req.clone());
    b.push_request(req.clone());
    c.push_request(req.clone());
    engine.tick();
    assert_eq!(*seen.lock(), vec![ClientId(1), ClientId(2), ClientId(3)], "first tick starts at the head");

    seen.lock().clear();
    a.push_request(req.clone());
    b.push_request(req.clone());
    c.push_request(req);
    engine.tick();
    assert_eq!(*seen.lock(), vec![ClientId(2), ClientId(3), ClientId(1)], "second tick rotates the head by one");
}

#[test]
fn a_slow_request_yields_and_the_budget_still_lets_the_next_client_run() {
    let registry = Arc::new(MockServiceRegistry::new());
    let clock = Arc::new(ManualClock::new());

    let calls = Arc::new(AtomicU32::new(0));
    let clock_for_slow = clock.clone();
    let calls_for_slow = calls.clone();
    registry.register_custom("orbit", "slow", move || {
        if calls_for_slow.fetch_add(1, Ordering::SeqCst) == 0 {
            clock_for_slow.advance(Duration::from_millis(3));
            HandleOutcome::Pending
        } else {
            HandleOutcome::Done(serde_json::json!("a-done"))
        }
    });
    let clock_for_fast = clock.clone();
    registry.register_custom("orbit", "fast", move || {
        clock_for_fast.advance(Duration::from_millis(2));
        HandleOutcome::Done(serde_json::json!("b-done"))
    });

    let mut engine = Engine::with_clock(registry, clock);
    engine.configure(|cfg| cfg.with_max_time_per_update(Duration::from_millis(4)));

    let transport = MockTransport::new();
    let a = transport.add_client(ClientId(1), "a");
    let b = transport.add_client(ClientId(2), "b");
    engine.attach_rpc_transport(Box::new(transport));

    a.push_request(Request::new("orbit", "slow", vec![]));
    b.push_request(Request::new("orbit", "fast", vec![]));

    engine.tick();
    assert!(a.sent_responses().is_empty(), "A suspended after consuming most of the budget");
    assert_eq!(b.sent_responses().len(), 1, "B still ran: the budget check happens before dispatch, not after");

    engine.tick();
    assert_eq!(a.sent_responses().len(), 1, "A's carried-over continuation resumes and completes next tick");
}

#[test]
fn one_rpc_per_update_dispatches_exactly_one_fresh_request_per_tick() {
    let registry = Arc::new(MockServiceRegistry::new());
    registry.register_immediate("orbit", "ping", serde_json::json!("pong"));
    let clock = Arc::new(ManualClock::new());
    let mut engine = Engine::with_clock(registry, clock);
    engine.configure(|cfg| cfg.with_one_rpc_per_update(true));

    let transport = MockTransport::new();
    let a = transport.add_client(ClientId(1), "a");
    let b = transport.add_client(ClientId(2), "b");
    engine.attach_rpc_transport(Box::new(transport));

    let req = Request::new("orbit", "ping", vec![]);
    a.push_request(req.clone());
    b.push_request(req);

    engine.tick();
    let a_after_1 = a.sent_responses().len();
    let b_after_1 = b.sent_responses().len();
    assert_eq!(a_after_1 + b_after_1, 1, "exactly one request executes, the round-robin head");

    engine.tick();
    assert_eq!(a.sent_responses().len(), 1, "both clients eventually get served, one per tick");
    assert_eq!(b.sent_responses().len(), 1);
}

#[test]
fn the_adaptive_controller_converges_to_the_floor_under_sustained_slow_ticks_and_snaps_back_when_idle() {
    let registry = Arc::new(MockServiceRegistry::new());
    let clock = Arc::new(ManualClock::new());

    let clock_for_cost = clock.clone();
    registry.register_custom("orbit", "cost", move || {
        clock_for_cost.advance(Duration::from_millis(12));
        HandleOutcome::Done(serde_json::json!(1))
    });
    registry.register_custom("orbit", "cheap", || HandleOutcome::Done(serde_json::json!(1)));

    let mut engine = Engine::with_clock(registry, clock);
    engine.set_adaptive_controller_config(AdaptiveControllerConfig {
        target_tick_period: Duration::from_millis(5),
        step: Duration::from_micros(100),
        floor: Duration::from_micros(1_000),
        ceiling: Duration::from_micros(25_000),
        idle_exec_threshold: Duration::from_millis(1),
        idle_reset_to: Duration::from_micros(10_000),
    });

    let transport = MockTransport::new();
    let client = transport.add_client(ClientId(1), "a");
    engine.attach_rpc_transport(Box::new(transport));

    let mut last = engine.config().max_time_per_update;
    for _ in 0..100 {
        client.push_request(Request::new("orbit", "cost", vec![]));
        engine.tick();
        let current = engine.config().max_time_per_update;
        assert!(current <= last, "a 12ms tick against a 5ms target must never increase the budget");
        last = current;
    }
    assert_eq!(last, Duration::from_micros(1_000), "100 slow ticks converge to the floor");

    client.push_request(Request::new("orbit", "cheap", vec![]));
    engine.tick();
    assert_eq!(
        engine.config().max_time_per_update,
        Duration::from_micros(10_000),
        "one idle tick (exec well under 1ms) re-arms the budget immediately"
    );
}

#[test]
fn a_stream_batches_only_changed_values_and_stamps_the_current_universal_time() {
    let registry = Arc::new(MockServiceRegistry::new());
    let cell = registry.register_dynamic("orbit", "altitude", serde_json::json!(1));
    let clock = Arc::new(ManualClock::new());
    let mut engine = Engine::with_clock(registry, clock.clone());

    let stream_transport = tickrpc_testkit::MockStreamTransport::new();
    let stream_client = stream_transport.add_client(ClientId(1));
    engine.attach_stream_transport(Box::new(stream_transport));
    engine.tick(); // register the stream client before subscribing

    engine.add_stream(ClientId(1), &Request::new("orbit", "altitude", vec![])).expect("stream channel exists");

    clock.set_universal_time(100.0);
    engine.tick();
    let after_first = stream_client.written_messages();
    assert_eq!(after_first.len(), 1, "never-sent -> sent");
    assert_eq!(after_first[0].entries[0].1, tickrpc_core::Response::success(encode_value(&serde_json::json!(1)), 100.0));

    clock.set_universal_time(200.0);
    engine.tick();
    assert_eq!(stream_client.written_messages().len(), 1, "unchanged -> suppressed, no new batch");

    *cell.lock() = serde_json::json!(2);
    clock.set_universal_time(300.0);
    engine.tick();
    let after_third = stream_client.written_messages();
    assert_eq!(after_third.len(), 2, "changed -> sent");
    assert_eq!(after_third[1].entries[0].1, tickrpc_core::Response::success(encode_value(&serde_json::json!(2)), 300.0));
}

#[derive(Default)]
struct LifecycleRecorder {
    disconnected: Arc<Mutex<Vec<ClientId>>>,
}

impl Observer for LifecycleRecorder {
    fn on_rpc_client_disconnected(&mut self, client: ClientId) {
        self.disconnected.lock().push(client);
    }
}

#[test]
fn a_client_disconnecting_while_its_continuation_is_queued_is_dropped_silently() {
    let registry = Arc::new(MockServiceRegistry::new());
    registry.register_suspend_then_complete("orbit", "burn", 1, serde_json::json!("done"));
    let clock = Arc::new(ManualClock::new());
    let mut engine = Engine::with_clock(registry, clock);

    let disconnected = Arc::new(Mutex::new(Vec::new()));
    engine.add_observer(Box::new(LifecycleRecorder { disconnected: disconnected.clone() }));

    let transport = MockTransport::new();
    let client = transport.add_client(ClientId(1), "a");
    engine.attach_rpc_transport(Box::new(transport));

    client.push_request(Request::new("orbit", "burn", vec![]));
    engine.tick();
    assert!(client.sent_responses().is_empty(), "first poll suspends, nothing sent yet");

    client.disconnect();
    engine.tick();
    assert!(client.sent_responses().is_empty(), "the carried-over continuation is dropped, never resumed");
    assert_eq!(*disconnected.lock(), vec![ClientId(1)]);

    // A further tick must not panic or resurrect the dropped continuation.
    engine.tick();
    assert!(client.sent_responses().is_empty());
}

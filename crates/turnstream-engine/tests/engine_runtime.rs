//! Runtime tests over the in-process channel transport.
//!
//! Time is paused, so restart delays elapse instantly and deterministically.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use tokio::time::Instant;
use turnstream_engine::{
    ChannelTransport, Engine, EngineConfig, EngineError, EngineSlot, FrameMode, Observer,
    RunState, Snapshot, Step, TransportSignal, TurnStatus,
};
use turnstream_proto::{TextFrame, WireEvent};

const AGENT: &str = "333";

type Published = Arc<Mutex<Vec<Snapshot>>>;

fn recorder() -> (Published, impl Observer + 'static) {
    let published: Published = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&published);
    (published, move |snapshot: &Snapshot| sink.lock().unwrap().push(snapshot.clone()))
}

fn frame(event: &WireEvent) -> Bytes {
    TextFrame::from_event(event).encode().expect("encode")
}

fn config() -> EngineConfig {
    EngineConfig::new(FrameMode::Text, AGENT)
}

#[tokio::test(start_paused = true)]
async fn stall_restarts_after_delay_and_keeps_turns() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let (published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");
    engine.start().expect("start");

    assert!(host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 1, "Hel"))));
    assert!(host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 2, "lo").finished())));
    assert_eq!(engine.step().await.expect("step"), Step::Event);
    assert_eq!(engine.step().await.expect("step"), Step::Event);

    assert!(host.signal(TransportSignal::Stalled));
    assert_eq!(engine.step().await.expect("step"), Step::Event);
    assert_eq!(engine.run_state(), RunState::Restarting);
    assert!(!host.is_subscribed());

    // Restart gap: nothing is listening.
    assert!(!host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 2, 1, "lost"))));

    let stalled_at = Instant::now();
    assert_eq!(engine.step().await.expect("step"), Step::Tick);
    assert!(Instant::now() - stalled_at >= Duration::from_millis(50));
    assert_eq!(engine.run_state(), RunState::Running);
    assert_eq!(host.subscribe_count(), 2);

    assert!(host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 2, 1, "Again"))));
    assert_eq!(engine.step().await.expect("step"), Step::Event);

    let last = published.lock().unwrap().last().cloned().expect("published");
    assert_eq!(
        last.get(1).map(|r| (r.text.as_str(), r.status)),
        Some(("Hello", TurnStatus::Completed))
    );
    assert_eq!(last.in_progress.as_ref().map(|r| r.turn_id), Some(2));
    assert_eq!(engine.stats().restarts, 1);
}

#[tokio::test(start_paused = true)]
async fn diagnostic_stall_restarts_once() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let (_published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");
    engine.start().expect("start");

    host.signal(TransportSignal::Diagnostic { message: "Message service is not running".into() });
    engine.step().await.expect("step");
    assert_eq!(engine.run_state(), RunState::Restarting);

    assert_eq!(engine.step().await.expect("step"), Step::Tick);
    assert_eq!(engine.run_state(), RunState::Running);
    assert_eq!(engine.stats().restarts, 1);
}

#[tokio::test]
async fn transport_close_stops_and_flushes() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let (published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");
    engine.start().expect("start");

    host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 1, "Hel")));
    host.close();

    assert_eq!(engine.step().await.expect("step"), Step::Event);
    assert_eq!(engine.step().await.expect("step"), Step::Closed);
    assert_eq!(engine.run_state(), RunState::Stopped);
    assert_eq!(engine.step().await.expect("step"), Step::Idle);
    assert_eq!(published.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn refused_initial_subscription_leaves_engine_stopped() {
    let transport = ChannelTransport::new();
    transport.close();
    let (_published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");

    let result = engine.start();
    assert!(matches!(result, Err(EngineError::SubscriptionRefused(_))));
    assert_eq!(engine.run_state(), RunState::Stopped);
}

#[test]
fn invalid_config_is_a_construction_error() {
    let (_published, observer) = recorder();
    let result =
        Engine::new(EngineConfig::new(FrameMode::Text, ""), ChannelTransport::new(), observer);
    assert!(matches!(result, Err(EngineError::Construction(_))));
}

#[tokio::test]
async fn run_until_shutdown_flushes() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let (published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");
    engine.start().expect("start");

    host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 1, "Hi").finished()));
    let shutdown = tokio::time::sleep(Duration::from_millis(10));
    engine.run_until(shutdown).await.expect("run");

    assert_eq!(engine.run_state(), RunState::Stopped);
    assert!(!host.is_subscribed());
    let final_snapshot = published.lock().unwrap().last().cloned().expect("flush");
    assert_eq!(final_snapshot.get(1).map(|r| r.text.as_str()), Some("Hi"));
}

#[tokio::test]
async fn spawned_engine_reports_on_stop() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let (_published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");
    engine.start().expect("start");
    let handle = engine.spawn();

    host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 1, "Hi").finished()));
    tokio::task::yield_now().await;

    let report = handle.stop().await.expect("report");
    assert!(report.error.is_none());
    assert_eq!(report.stats.frames_applied, 1);
    assert_eq!(report.snapshot.len(), 1);
    assert!(!host.is_subscribed());
}

#[tokio::test]
async fn dropping_handle_releases_subscription() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let (_published, observer) = recorder();
    let mut engine = Engine::new(config(), transport, observer).expect("engine");
    engine.start().expect("start");
    drop(engine.spawn());

    for _ in 0..10 {
        if !host.is_subscribed() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!host.is_subscribed());
}

#[tokio::test]
async fn slot_tears_down_previous_engine_first() {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let mut slot = EngineSlot::new();

    let (first_published, first) = recorder();
    assert!(slot.attach(config(), transport.clone(), first).await.expect("attach").is_none());
    host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 1, "Hel")));
    tokio::task::yield_now().await;

    // ChannelTransport refuses concurrent subscriptions, so this only
    // succeeds if the first engine released its subscription first.
    let (second_published, second) = recorder();
    let report = slot.attach(config(), transport, second).await.expect("attach").expect("report");
    assert!(slot.is_attached());
    assert_eq!(host.subscribe_count(), 2);
    assert_eq!(report.snapshot.in_progress.as_ref().map(|r| r.text.as_str()), Some("Hel"));
    assert_eq!(first_published.lock().unwrap().last(), Some(&report.snapshot));

    host.deliver_frame(AGENT, frame(&WireEvent::delta(AGENT, 1, 1, "new")));
    tokio::task::yield_now().await;
    let detached = slot.detach().await.expect("detach").expect("report");
    assert_eq!(detached.snapshot.get(1).map(|r| r.text.as_str()), Some("new"));
    let seen = second_published.lock().unwrap();
    assert!(seen.iter().all(|s| s.get(1).is_none_or(|r| r.text == "new")));
    assert!(!slot.is_attached());
}

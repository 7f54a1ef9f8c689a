//! Fuzz target for the engine controller
//!
//! Drives the controller with arbitrary frames, faults, stalls, aborts,
//! clock advances and start/stop calls, recording every published snapshot.
//!
//! # Invariants
//!
//! - Snapshots are sorted and hold at most one in-progress turn
//! - Turn status never regresses; terminal text never changes
//! - Turns are never lost, including across restarts
//! - Only the configured agent's turns appear

#![no_main]

use std::time::{Duration, Instant};

use libfuzzer_sys::fuzz_target;
use turnstream_core::{
    Controller, ControllerAction, EngineConfig, FrameMode, SpeakerId, TransportSignal,
};
use turnstream_harness::{encode, InvariantRegistry, Operation, SnapshotHistory};

const AGENT: &str = "333";

fn record(history: &mut SnapshotHistory, actions: Vec<ControllerAction>) {
    for action in actions {
        if let ControllerAction::Publish(snapshot) = action {
            history.record(snapshot);
        }
    }
}

fuzz_target!(|input: (bool, Vec<Operation>)| {
    let (legacy, ops) = input;
    let mode = if legacy { FrameMode::Legacy } else { FrameMode::Text };
    let Ok(mut controller) = Controller::new(EngineConfig::new(mode, AGENT)) else {
        return;
    };
    let agent = SpeakerId::from(AGENT);
    let mut history = SnapshotHistory::new(Some(agent.clone()));
    let mut now = Instant::now();

    record(&mut history, controller.start(now));
    for op in &ops {
        let actions = match op {
            Operation::Fragment { .. } | Operation::Fault { .. } | Operation::Foreign { .. } => {
                match op.event(&agent) {
                    Some(event) => {
                        let raw = encode(mode, &event);
                        controller.handle_frame(&event.speaker_id, &raw, now)
                    }
                    None => Vec::new(),
                }
            }
            Operation::Garbage(bytes) => controller.handle_frame(&agent, bytes, now),
            Operation::Stall => controller.handle_signal(TransportSignal::Stalled, now),
            Operation::Abort { turn } => controller
                .handle_signal(TransportSignal::TurnAborted { turn_id: u64::from(*turn % 6) }, now),
            Operation::Advance(ms) => {
                now += Duration::from_millis(u64::from(*ms));
                controller.tick(now)
            }
            Operation::Start => controller.start(now),
            Operation::Stop => controller.stop(),
        };
        record(&mut history, actions);
    }
    record(&mut history, controller.stop());

    InvariantRegistry::standard().assert_all(&history, "controller fuzz");
});

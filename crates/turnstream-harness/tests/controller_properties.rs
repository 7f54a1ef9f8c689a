//! Controller invariants under arbitrary operation sequences.
//!
//! Operations are decoded from random bytes with `arbitrary`, the same way
//! the fuzz targets build them, and driven through the controller with
//! virtual time. Every published snapshot is checked against the standard
//! invariants, and the final transcript against the reference model.

use std::time::{Duration, Instant};

use arbitrary::Unstructured;
use proptest::prelude::*;
use turnstream_core::{
    Controller, ControllerAction, EngineConfig, FrameMode, RunState, SpeakerId, TransportSignal,
};
use turnstream_harness::{
    ChaosFeed, InvariantRegistry, ModelTranscript, Operation, SnapshotHistory, TurnScript, encode,
};
use turnstream_proto::FrameDecoder;

const AGENT: &str = "333";

struct Driver {
    ctrl: Controller,
    mode: FrameMode,
    now: Instant,
    history: SnapshotHistory,
    model: ModelTranscript,
}

impl Driver {
    fn new(mode: FrameMode) -> Self {
        Self {
            ctrl: Controller::new(EngineConfig::new(mode, AGENT)).expect("valid config"),
            mode,
            now: Instant::now(),
            history: SnapshotHistory::new(Some(SpeakerId::from(AGENT))),
            model: ModelTranscript::new(),
        }
    }

    fn collect(&mut self, actions: Vec<ControllerAction>) {
        for action in actions {
            if let ControllerAction::Publish(snapshot) = action {
                self.history.record(snapshot);
            }
        }
    }

    fn deliver(&mut self, speaker: &SpeakerId, raw: &[u8]) {
        let running = self.ctrl.run_state() == RunState::Running;
        if running && speaker.as_str() == AGENT {
            match FrameDecoder::new(self.mode).decode(speaker, raw) {
                Ok(event) => self.model.apply(&event),
                Err(error) => {
                    if let Some(turn_id) = error.turn_id() {
                        self.model.fault(turn_id);
                    }
                },
            }
        }
        let actions = self.ctrl.handle_frame(speaker, raw, self.now);
        self.collect(actions);
    }

    fn apply(&mut self, op: &Operation) {
        let agent = SpeakerId::from(AGENT);
        match op {
            Operation::Fragment { .. } | Operation::Fault { .. } | Operation::Foreign { .. } => {
                if let Some(event) = op.event(&agent) {
                    let raw = encode(self.mode, &event);
                    let speaker = event.speaker_id.clone();
                    self.deliver(&speaker, &raw);
                }
            },
            Operation::Garbage(bytes) => self.deliver(&agent, bytes),
            Operation::Stall => {
                let actions = self.ctrl.handle_signal(TransportSignal::Stalled, self.now);
                self.collect(actions);
            },
            Operation::Abort { turn } => {
                let turn_id = u64::from(*turn % 6);
                if self.ctrl.run_state() != RunState::Stopped {
                    self.model.fault(turn_id);
                }
                let actions =
                    self.ctrl.handle_signal(TransportSignal::TurnAborted { turn_id }, self.now);
                self.collect(actions);
            },
            Operation::Advance(ms) => {
                self.now += Duration::from_millis(u64::from(*ms));
                let actions = self.ctrl.tick(self.now);
                self.collect(actions);
            },
            Operation::Start => {
                let actions = self.ctrl.start(self.now);
                self.collect(actions);
            },
            Operation::Stop => {
                let actions = self.ctrl.stop();
                self.collect(actions);
            },
        }
    }
}

fn operations() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(any::<u8>(), 0..1024).prop_map(|bytes| {
        let mut unstructured = Unstructured::new(&bytes);
        let mut ops = vec![Operation::Start];
        ops.extend(unstructured.arbitrary::<Vec<Operation>>().unwrap_or_default());
        ops
    })
}

proptest! {
    /// INVARIANT: published snapshots satisfy every standard invariant.
    #[test]
    fn prop_published_snapshots_hold_invariants(ops in operations(), legacy in any::<bool>()) {
        let mode = if legacy { FrameMode::Legacy } else { FrameMode::Text };
        let mut driver = Driver::new(mode);
        for op in &ops {
            driver.apply(op);
        }
        let actions = driver.ctrl.stop();
        driver.collect(actions);

        let result = InvariantRegistry::standard().check_all(&driver.history);
        prop_assert!(result.is_ok(), "{:?}", result.err());
    }

    /// The controller's transcript equals the model fed with exactly the
    /// frames the controller accepted.
    #[test]
    fn prop_controller_matches_model(ops in operations()) {
        let mut driver = Driver::new(FrameMode::Text);
        for op in &ops {
            driver.apply(op);
        }

        let actual: Vec<_> = driver
            .ctrl
            .snapshot()
            .records()
            .into_iter()
            .map(|r| (r.turn_id, r.text.clone(), r.status))
            .collect();
        prop_assert_eq!(actual, driver.model.observable());
    }
}

#[test]
fn duplicated_delivery_converges_to_clean_transcript() {
    let events: Vec<_> = [
        TurnScript::new(AGENT, 1).fragment("Hel").fragment("lo").finish(" there"),
        TurnScript::new(AGENT, 2).fragment("How").fragment(" are").replace_with("How are you?"),
        TurnScript::new(AGENT, 3).fragment("Let me").fragment(" check"),
    ]
    .iter()
    .flat_map(|script| script.events().to_vec())
    .collect();

    let mut clean = Driver::new(FrameMode::Legacy);
    clean.apply(&Operation::Start);
    for event in &events {
        clean.deliver(&SpeakerId::from(AGENT), &encode(FrameMode::Legacy, event));
    }

    for seed in 0..32 {
        let mut chaotic = Driver::new(FrameMode::Legacy);
        chaotic.apply(&Operation::Start);
        for event in ChaosFeed::new(seed).with_duplicates(0.4).schedule(&events) {
            chaotic.deliver(&SpeakerId::from(AGENT), &encode(FrameMode::Legacy, &event));
        }

        assert_eq!(chaotic.ctrl.snapshot(), clean.ctrl.snapshot(), "seed {seed}");
        InvariantRegistry::standard().assert_all(&chaotic.history, &format!("seed {seed}"));
    }
}

#[test]
fn reordered_delivery_keeps_invariants() {
    let events: Vec<_> = (1..=4)
        .flat_map(|turn| {
            TurnScript::new(AGENT, turn).fragment("a").fragment("b").finish("c").events().to_vec()
        })
        .collect();

    for seed in 0..32 {
        let mut driver = Driver::new(FrameMode::Text);
        driver.apply(&Operation::Start);
        for event in ChaosFeed::new(seed).with_duplicates(0.2).with_swaps(0.3).schedule(&events) {
            driver.deliver(&SpeakerId::from(AGENT), &encode(FrameMode::Text, &event));
        }
        InvariantRegistry::standard().assert_all(&driver.history, &format!("seed {seed}"));
        assert_eq!(driver.ctrl.snapshot().len(), 4);
    }
}

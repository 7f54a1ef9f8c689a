//! Model-based property tests.
//!
//! These tests generate random event sequences and verify that the real
//! turn buffer behaves identically to the reference model.
//!
//! ```text
//! proptest generates: Vec<WireEvent>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!   ModelTranscript    TurnBuffer      Compare
//!     (reference)        (real)        Results
//! ```

use proptest::prelude::*;
use turnstream_core::{Snapshot, TurnBuffer, TurnFault, TurnStatus, WireEvent};
use turnstream_harness::ModelTranscript;

fn speaker_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![4 => Just("333"), 1 => Just("1001")]
}

fn event_strategy() -> impl Strategy<Value = WireEvent> {
    (
        speaker_strategy(),
        0u64..6,
        1u64..6,
        prop_oneof![Just(""), Just("a"), Just("lo"), Just("Hel"), Just(" ")],
        prop::bool::weighted(0.25),
        prop::bool::weighted(0.3),
        prop_oneof![
            8 => Just(None),
            1 => Just(Some(TurnFault::Interrupted)),
            1 => Just(Some(TurnFault::Invalidated)),
        ],
    )
        .prop_map(|(speaker, turn_id, seq, text, is_final, replace, fault)| {
            let mut event = WireEvent::delta(speaker, turn_id, seq, text);
            if is_final {
                event = if replace { event.replacing() } else { event.finished() };
            }
            event.fault = fault;
            event
        })
}

#[derive(Debug, Clone)]
enum Step {
    Apply(WireEvent),
    Fault(u64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        9 => event_strategy().prop_map(Step::Apply),
        1 => (0u64..6).prop_map(Step::Fault),
    ]
}

fn observable(buffer: &TurnBuffer) -> Vec<(u64, String, TurnStatus)> {
    Snapshot::capture(buffer)
        .records()
        .into_iter()
        .map(|r| (r.turn_id, r.text.clone(), r.status))
        .collect()
}

proptest! {
    /// Buffer and model agree after every step.
    #[test]
    fn prop_buffer_matches_model(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut buffer = TurnBuffer::new();
        let mut model = ModelTranscript::new();

        for (index, step) in steps.iter().enumerate() {
            match step {
                Step::Apply(event) => {
                    buffer.apply(event);
                    model.apply(event);
                },
                Step::Fault(turn_id) => {
                    buffer.fault(*turn_id);
                    model.fault(*turn_id);
                },
            }
            prop_assert_eq!(observable(&buffer), model.observable(), "diverged at step {}", index);
        }
    }

    /// Replaying the same steps twice yields the same transcript.
    #[test]
    fn prop_buffer_is_deterministic(steps in prop::collection::vec(event_strategy(), 0..40)) {
        let mut first = TurnBuffer::new();
        let mut second = TurnBuffer::new();
        for event in &steps {
            first.apply(event);
        }
        for event in &steps {
            second.apply(event);
        }
        prop_assert_eq!(Snapshot::capture(&first), Snapshot::capture(&second));
    }
}

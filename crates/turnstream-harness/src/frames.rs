//! Frame builders.
//!
//! Tests describe turns as scripts of fragments and encode them with the
//! real framings, so the decoder is always part of the pipeline under test.

use bytes::Bytes;
use turnstream_core::{FrameMode, SpeakerId, TurnFault, TurnId, WireEvent};
use turnstream_proto::{LegacyFlags, LegacyFrame, TextFrame};

/// Encode an event in the given framing.
///
/// Legacy frames carry 32-bit turn ids and sequence numbers; larger values
/// saturate. Encoding failures (text over the frame limit) yield an empty
/// payload, which the decoder rejects.
pub fn encode(mode: FrameMode, event: &WireEvent) -> Bytes {
    let encoded = match mode {
        FrameMode::Text => TextFrame::from_event(event).encode(),
        FrameMode::Legacy => LegacyFrame {
            turn_id: u32::try_from(event.turn_id).unwrap_or(u32::MAX),
            seq: u32::try_from(event.seq).unwrap_or(u32::MAX),
            flags: LegacyFlags::from_event(event),
            text: event.text.clone(),
        }
        .encode(),
    };
    encoded.unwrap_or_default()
}

/// Builder for the frames of one turn.
///
/// Sequence numbers are assigned in order starting at 1.
///
/// ```ignore
/// let events = TurnScript::new("333", 1).fragment("Hel").finish("lo").events();
/// ```
#[derive(Debug, Clone)]
pub struct TurnScript {
    speaker_id: SpeakerId,
    turn_id: TurnId,
    events: Vec<WireEvent>,
}

impl TurnScript {
    /// Empty script for `turn_id`.
    pub fn new(speaker_id: impl Into<SpeakerId>, turn_id: TurnId) -> Self {
        Self { speaker_id: speaker_id.into(), turn_id, events: Vec::new() }
    }

    fn next_seq(&self) -> u64 {
        self.events.len() as u64 + 1
    }

    fn push(mut self, event: WireEvent) -> Self {
        self.events.push(event);
        self
    }

    fn delta(&self, text: &str) -> WireEvent {
        WireEvent::delta(self.speaker_id.clone(), self.turn_id, self.next_seq(), text)
    }

    /// Append a streaming fragment.
    #[must_use]
    pub fn fragment(self, text: &str) -> Self {
        let event = self.delta(text);
        self.push(event)
    }

    /// Append the final fragment.
    #[must_use]
    pub fn finish(self, text: &str) -> Self {
        let event = self.delta(text).finished();
        self.push(event)
    }

    /// Append a final frame replacing the whole text.
    #[must_use]
    pub fn replace_with(self, text: &str) -> Self {
        let event = self.delta(text).replacing();
        self.push(event)
    }

    /// Append a fault frame.
    #[must_use]
    pub fn fault(self, fault: TurnFault) -> Self {
        let event = self.delta("").with_fault(fault);
        self.push(event)
    }

    /// Scripted events in order.
    pub fn events(&self) -> &[WireEvent] {
        &self.events
    }

    /// Scripted events encoded in `mode`.
    pub fn encoded(&self, mode: FrameMode) -> Vec<Bytes> {
        self.events.iter().map(|event| encode(mode, event)).collect()
    }
}

//! Reference model and operations for model-based testing.
//!
//! [`ModelTranscript`] is a deliberately naive transcript: a flat list of
//! turns scanned linearly, with every rule written out in the most direct
//! way. Operations are generated randomly (proptest or a fuzzer) and applied
//! to both the model and the real implementation.

use arbitrary::Arbitrary;
use turnstream_core::{SpeakerId, TurnFault, TurnId, TurnStatus, WireEvent};

/// One turn in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTurn {
    /// Turn id.
    pub turn_id: TurnId,
    /// Speaker that opened the turn.
    pub speaker_id: SpeakerId,
    /// Accumulated text.
    pub text: String,
    /// Lifecycle state.
    pub status: TurnStatus,
    /// Highest applied sequence number.
    pub last_seq: u64,
    /// Turn has been `InProgress` at some point.
    pub streamed: bool,
}

/// Reference transcript.
#[derive(Debug, Clone, Default)]
pub struct ModelTranscript {
    turns: Vec<ModelTurn>,
}

impl ModelTranscript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &WireEvent) {
        let newer_exists = self
            .turns
            .iter()
            .any(|t| t.speaker_id == event.speaker_id && t.turn_id > event.turn_id && t.streamed);

        let index = match self.turns.iter().position(|t| t.turn_id == event.turn_id) {
            Some(index) => index,
            None => {
                self.turns.push(ModelTurn {
                    turn_id: event.turn_id,
                    speaker_id: event.speaker_id.clone(),
                    text: String::new(),
                    status: TurnStatus::Pending,
                    last_seq: 0,
                    streamed: false,
                });
                self.turns.len() - 1
            },
        };

        let turn = &mut self.turns[index];
        if turn.speaker_id != event.speaker_id || event.seq <= turn.last_seq {
            return;
        }

        // Finished turns ignore everything but an invalidation, which only
        // flips the status.
        let finished = matches!(turn.status, TurnStatus::Completed | TurnStatus::Error);
        if finished {
            if event.fault == Some(TurnFault::Invalidated) {
                turn.last_seq = event.seq;
                turn.status = TurnStatus::Error;
            }
            return;
        }
        turn.last_seq = event.seq;

        if event.replace {
            turn.text = event.text.clone();
        } else {
            turn.text += &event.text;
        }

        turn.status = if event.fault.is_some() {
            TurnStatus::Error
        } else if event.is_final || newer_exists {
            TurnStatus::Completed
        } else {
            TurnStatus::InProgress
        };

        if turn.status == TurnStatus::InProgress {
            turn.streamed = true;
            let speaker = turn.speaker_id.clone();
            let turn_id = turn.turn_id;
            for other in &mut self.turns {
                if other.speaker_id == speaker
                    && other.turn_id != turn_id
                    && other.status == TurnStatus::InProgress
                {
                    other.status = TurnStatus::Completed;
                }
            }
        }
    }

    /// Fault a known turn, leaving completed turns alone.
    pub fn fault(&mut self, turn_id: TurnId) {
        if let Some(turn) = self.turns.iter_mut().find(|t| t.turn_id == turn_id)
            && turn.status != TurnStatus::Completed
        {
            turn.status = TurnStatus::Error;
        }
    }

    /// Turns sorted by id.
    pub fn turns(&self) -> Vec<&ModelTurn> {
        let mut turns: Vec<&ModelTurn> = self.turns.iter().collect();
        turns.sort_by_key(|t| t.turn_id);
        turns
    }

    /// Observable state: `(turn id, text, status)` sorted by id.
    pub fn observable(&self) -> Vec<(TurnId, String, TurnStatus)> {
        self.turns().into_iter().map(|t| (t.turn_id, t.text.clone(), t.status)).collect()
    }
}

/// Short text fragment (keeps the search space small).
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallText(pub u8);

impl SmallText {
    /// Fragment text: empty, or one to three letters.
    pub fn as_text(&self) -> String {
        const WORDS: [&str; 8] = ["", "a", "b", "hi", "lo", " ", "ok!", "é"];
        WORDS[usize::from(self.0) % WORDS.len()].to_string()
    }
}

/// Operations that can be applied to an engine.
///
/// Turn ids and sequence numbers are kept tiny so duplicates, stale frames
/// and superseded turns are common.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Fragment from the agent.
    Fragment {
        /// Turn id (mod 6).
        turn: u8,
        /// Sequence number (mod 8, plus one).
        seq: u8,
        /// Fragment text.
        text: SmallText,
        /// Final frame.
        is_final: bool,
        /// Full replacement (implies final).
        replace: bool,
    },
    /// Agent flags a fault on a turn.
    Fault {
        /// Turn id (mod 6).
        turn: u8,
        /// Sequence number (mod 8, plus one).
        seq: u8,
        /// Invalidation rather than interruption.
        invalidate: bool,
    },
    /// Fragment from some other participant.
    Foreign {
        /// Turn id (mod 6).
        turn: u8,
    },
    /// Arbitrary bytes from the agent.
    Garbage(Vec<u8>),
    /// Transport stall signal.
    Stall,
    /// Transport aborted a turn.
    Abort {
        /// Turn id (mod 6).
        turn: u8,
    },
    /// Advance time by this many milliseconds.
    Advance(u8),
    /// Owner starts the engine.
    Start,
    /// Owner stops the engine.
    Stop,
}

impl Operation {
    /// Wire event for frame-carrying operations.
    pub fn event(&self, agent: &SpeakerId) -> Option<WireEvent> {
        match self {
            Self::Fragment { turn, seq, text, is_final, replace } => {
                let event =
                    WireEvent::delta(agent.clone(), turn_id(*turn), seq_no(*seq), text.as_text());
                Some(match (*replace, *is_final) {
                    (true, _) => event.replacing(),
                    (false, true) => event.finished(),
                    (false, false) => event,
                })
            },
            Self::Fault { turn, seq, invalidate } => {
                let fault = if *invalidate { TurnFault::Invalidated } else { TurnFault::Interrupted };
                Some(
                    WireEvent::delta(agent.clone(), turn_id(*turn), seq_no(*seq), "")
                        .with_fault(fault),
                )
            },
            Self::Foreign { turn } => {
                Some(WireEvent::delta(SpeakerId::from("foreign"), turn_id(*turn), 1, "x"))
            },
            _ => None,
        }
    }
}

fn turn_id(raw: u8) -> TurnId {
    TurnId::from(raw % 6)
}

fn seq_no(raw: u8) -> u64 {
    u64::from(raw % 8) + 1
}

//! Per-session engine state.

use std::fmt;

use turnstream_proto::{FrameMode, TurnId, WireEvent};

use crate::{ApplyOutcome, Snapshot, SnapshotPublisher, TurnBuffer, TurnStatus};

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Not subscribed; frames are dropped
    #[default]
    Stopped,
    /// Subscribed and applying frames
    Running,
    /// Stall detected; waiting for the resubscription deadline
    Restarting,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Restarting => "restarting",
        };
        f.write_str(label)
    }
}

/// State owned by one engine instance.
///
/// Never shared between sessions. The buffered turns survive restarts and
/// are only released when the state is dropped.
#[derive(Debug, Clone)]
pub struct EngineState {
    mode: FrameMode,
    turns: TurnBuffer,
    run_state: RunState,
    publisher: SnapshotPublisher,
}

impl EngineState {
    /// Fresh, stopped state for the given framing.
    pub fn new(mode: FrameMode) -> Self {
        Self {
            mode,
            turns: TurnBuffer::new(),
            run_state: RunState::Stopped,
            publisher: SnapshotPublisher::new(),
        }
    }

    /// Framing fixed at construction.
    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    /// Buffered turns.
    pub fn turns(&self) -> &TurnBuffer {
        &self.turns
    }

    /// Current lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub(crate) fn set_run_state(&mut self, run_state: RunState) {
        self.run_state = run_state;
    }

    /// Apply a decoded event to the buffer.
    pub fn ingest(&mut self, event: &WireEvent) -> ApplyOutcome {
        self.turns.apply(event)
    }

    /// Fault a known turn. `None` if the turn was never seen.
    pub fn fault_turn(&mut self, turn_id: TurnId) -> Option<TurnStatus> {
        self.turns.fault(turn_id)
    }

    /// Snapshot if the transcript changed since the last emission.
    pub fn publish(&mut self) -> Option<Snapshot> {
        self.publisher.publish(&self.turns)
    }

    /// Snapshot emitted unconditionally.
    pub fn flush(&mut self) -> Snapshot {
        self.publisher.flush(&self.turns)
    }

    /// Current transcript, without recording an emission.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.turns)
    }

    /// Last emitted snapshot.
    pub fn last_emission(&self) -> Option<&Snapshot> {
        self.publisher.last_emission()
    }
}

//! Turn records.

use std::fmt;

use serde::Serialize;
use turnstream_proto::{SpeakerId, TurnId};

/// Lifecycle state of a turn.
///
/// Ordered by progress: `Pending < InProgress < Completed`. `Error` is
/// terminal and reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Created, no text yet.
    Pending,
    /// Receiving fragments.
    InProgress,
    /// Final frame applied.
    Completed,
    /// Turn ended in a fault.
    Error,
}

impl TurnStatus {
    /// True for `Completed` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnRecord {
    /// Turn id assigned by the remote agent.
    pub turn_id: TurnId,
    /// Speaker that opened the turn. Never changes afterwards.
    pub speaker_id: SpeakerId,
    /// Accumulated text.
    pub text: String,
    /// Lifecycle state.
    pub status: TurnStatus,
    /// Last applied wire sequence number (0 before the first frame).
    pub last_seq: u64,
}

impl TurnRecord {
    /// Fresh `Pending` record with no text.
    pub fn new(turn_id: TurnId, speaker_id: SpeakerId) -> Self {
        Self { turn_id, speaker_id, text: String::new(), status: TurnStatus::Pending, last_seq: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_pending_and_empty() {
        let record = TurnRecord::new(4, SpeakerId::from("333"));
        assert_eq!(record.status, TurnStatus::Pending);
        assert!(record.text.is_empty());
        assert_eq!(record.last_seq, 0);
    }

    #[test]
    fn only_completed_and_error_are_terminal() {
        assert!(!TurnStatus::Pending.is_terminal());
        assert!(!TurnStatus::InProgress.is_terminal());
        assert!(TurnStatus::Completed.is_terminal());
        assert!(TurnStatus::Error.is_terminal());
    }
}

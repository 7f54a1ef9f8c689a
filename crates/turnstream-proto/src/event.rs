//! Decoded wire events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Turn identifier assigned by the remote agent.
///
/// Monotonically increasing and unique within one session.
pub type TurnId = u64;

/// Identity of a participant on the media session.
///
/// Transports identify senders by numeric uid or by string account; both are
/// carried as their string form so comparisons never depend on the
/// transport's numeric width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerId(String);

impl SpeakerId {
    /// Create a speaker identity from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the identity is empty (never a valid participant).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpeakerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SpeakerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SpeakerId {
    fn from(uid: u64) -> Self {
        Self(uid.to_string())
    }
}

/// Terminal fault the agent attached to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnFault {
    /// Turn was cut short (e.g. the user barged in). Ends an unfinished turn
    /// in error; has no effect on a turn that already completed.
    Interrupted,
    /// Agent retracted the turn. Overrides a completed turn as well.
    Invalidated,
}

/// One decoded stream message.
///
/// # Invariants
///
/// - `seq >= 1` (0 is reserved as "nothing applied yet")
/// - `replace` implies `is_final`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    /// Sender of the frame.
    pub speaker_id: SpeakerId,
    /// Turn the fragment belongs to.
    pub turn_id: TurnId,
    /// Per-turn sequence number.
    pub seq: u64,
    /// Text fragment (delta, or full text when `replace` is set).
    pub text: String,
    /// Last frame of the turn.
    pub is_final: bool,
    /// `text` replaces the accumulated text instead of extending it.
    pub replace: bool,
    /// Terminal fault flagged by the agent.
    pub fault: Option<TurnFault>,
}

impl WireEvent {
    /// Delta fragment for a turn that is still streaming.
    pub fn delta(
        speaker_id: impl Into<SpeakerId>,
        turn_id: TurnId,
        seq: u64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            turn_id,
            seq,
            text: text.into(),
            is_final: false,
            replace: false,
            fault: None,
        }
    }

    /// Mark this event as the final frame of its turn.
    #[must_use]
    pub fn finished(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark this event as a final full-text replacement.
    #[must_use]
    pub fn replacing(mut self) -> Self {
        self.is_final = true;
        self.replace = true;
        self
    }

    /// Attach a terminal fault.
    #[must_use]
    pub fn with_fault(mut self, fault: TurnFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// True if the event retracts its turn, overriding completion.
    pub fn invalidates(&self) -> bool {
        self.fault == Some(TurnFault::Invalidated)
    }
}

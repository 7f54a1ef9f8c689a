//! Turn buffer: authoritative map of turn id → record.
//!
//! Fragments are applied in delivery order. The per-turn sequence number only
//! guards against duplicates: a frame whose `seq` is not greater than the
//! last applied one is a no-op, so delivering `seq=2` before `seq=1` keeps
//! only the `seq=2` fragment. Delivery is assumed to be in order per turn.
//!
//! # Invariants
//!
//! - Records are never removed; the buffer only grows for its lifetime.
//! - A record's speaker never changes after creation.
//! - At most one record per speaker is `InProgress`. A newer turn reaching
//!   `InProgress` supersedes the older one, which becomes `Completed`. A
//!   newer turn that faults or completes without streaming supersedes
//!   nothing.

use std::collections::{BTreeMap, HashMap};

use turnstream_proto::{SpeakerId, TurnId, WireEvent};

use crate::{StatusTracker, TurnRecord, TurnStatus};

/// Result of applying one event to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Event was applied.
    Applied {
        /// Turn the event belonged to.
        turn_id: TurnId,
        /// Status before the event.
        from: TurnStatus,
        /// Status after the event.
        to: TurnStatus,
    },
    /// Duplicate or older frame, nothing changed.
    Stale {
        /// Sequence number already applied to the turn.
        last_seq: u64,
    },
    /// Turn already reached a terminal status and the event does not
    /// invalidate it.
    Sealed {
        /// Terminal status of the turn.
        status: TurnStatus,
    },
    /// Event came from a different speaker than the one that opened the
    /// turn.
    SpeakerConflict,
}

impl ApplyOutcome {
    /// True if the buffer changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Accumulates fragments per turn.
#[derive(Debug, Clone, Default)]
pub struct TurnBuffer {
    turns: BTreeMap<TurnId, TurnRecord>,
    /// Highest turn id per speaker that reached `InProgress`.
    latest: HashMap<SpeakerId, TurnId>,
    /// The `InProgress` turn per speaker, if any.
    active: HashMap<SpeakerId, TurnId>,
}

impl TurnBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded event.
    ///
    /// Creates the record (`Pending`) on first sight of a turn id. Appends
    /// the fragment, or replaces the text for a final replacement frame,
    /// then advances the status. An invalidation of a terminal turn changes
    /// only the status.
    pub fn apply(&mut self, event: &WireEvent) -> ApplyOutcome {
        let superseded =
            self.latest.get(&event.speaker_id).is_some_and(|&latest| latest > event.turn_id);

        let record = self
            .turns
            .entry(event.turn_id)
            .or_insert_with(|| TurnRecord::new(event.turn_id, event.speaker_id.clone()));

        if record.speaker_id != event.speaker_id {
            return ApplyOutcome::SpeakerConflict;
        }
        if event.seq <= record.last_seq {
            return ApplyOutcome::Stale { last_seq: record.last_seq };
        }

        let from = record.status;
        if from.is_terminal() && !event.invalidates() {
            return ApplyOutcome::Sealed { status: from };
        }

        if !from.is_terminal() {
            if event.replace {
                record.text.clone_from(&event.text);
            } else {
                record.text.push_str(&event.text);
            }
        }
        record.last_seq = event.seq;

        let to = StatusTracker::advance(from, event, superseded);
        record.status = to;

        let speaker = event.speaker_id.clone();
        let turn_id = event.turn_id;

        if to == TurnStatus::InProgress {
            self.latest
                .entry(speaker.clone())
                .and_modify(|latest| *latest = (*latest).max(turn_id))
                .or_insert(turn_id);
            if let Some(previous) = self.active.insert(speaker, turn_id)
                && previous != turn_id
            {
                self.supersede(previous);
            }
        } else if self.active.get(&speaker) == Some(&turn_id) {
            self.active.remove(&speaker);
        }

        ApplyOutcome::Applied { turn_id, from, to }
    }

    /// Fault a known turn (decoder or transport reported a terminal fault).
    ///
    /// Returns the new status, or `None` if the turn is unknown. Unknown
    /// turns are not created.
    pub fn fault(&mut self, turn_id: TurnId) -> Option<TurnStatus> {
        let record = self.turns.get_mut(&turn_id)?;
        record.status = StatusTracker::fault(record.status);
        let status = record.status;

        if status != TurnStatus::InProgress && self.active.get(&record.speaker_id) == Some(&turn_id)
        {
            self.active.remove(&record.speaker_id);
        }
        Some(status)
    }

    fn supersede(&mut self, turn_id: TurnId) {
        if let Some(record) = self.turns.get_mut(&turn_id) {
            let to = StatusTracker::supersede(record.status);
            tracing::debug!(turn_id, from = %record.status, to = %to, "turn superseded");
            record.status = to;
        }
    }

    /// Record for `turn_id`.
    pub fn get(&self, turn_id: TurnId) -> Option<&TurnRecord> {
        self.turns.get(&turn_id)
    }

    /// All records in ascending turn id order.
    pub fn iter(&self) -> impl Iterator<Item = &TurnRecord> {
        self.turns.values()
    }

    /// The `InProgress` turn of `speaker`, if any.
    pub fn in_progress(&self, speaker: &SpeakerId) -> Option<&TurnRecord> {
        self.active.get(speaker).and_then(|turn_id| self.turns.get(turn_id))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True if no turn has been seen.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

//! Checks registered by [`InvariantRegistry::standard`](super::InvariantRegistry::standard).

use std::collections::{BTreeSet, HashMap};

use turnstream_core::{StatusTracker, TurnId, TurnStatus};

use super::{Invariant, InvariantResult, SnapshotHistory, Violation};

/// Every snapshot lists turns strictly ascending by turn id.
///
/// The split-out in-progress turn must actually be `InProgress` and must not
/// also appear in the sorted list.
pub struct SortedTurns;

impl Invariant for SortedTurns {
    fn name(&self) -> &'static str {
        "sorted_turns"
    }

    fn check(&self, history: &SnapshotHistory) -> InvariantResult {
        for (index, snapshot) in history.snapshots.iter().enumerate() {
            let ids: Vec<TurnId> = snapshot.records().iter().map(|r| r.turn_id).collect();
            if ids.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("snapshot {index}: turn ids not strictly ascending {ids:?}"),
                });
            }
            if snapshot.turns.windows(2).any(|w| w[0].turn_id >= w[1].turn_id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("snapshot {index}: turn list unsorted"),
                });
            }
            if let Some(current) = &snapshot.in_progress
                && current.status != TurnStatus::InProgress
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "snapshot {index}: current turn {} is {}",
                        current.turn_id, current.status
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Turn statuses never regress between snapshots.
///
/// `Pending → InProgress → Completed`, with `Error` reachable from all of
/// them. Nothing leaves `Error`.
pub struct StatusMonotonicity;

impl Invariant for StatusMonotonicity {
    fn name(&self) -> &'static str {
        "status_monotonicity"
    }

    fn check(&self, history: &SnapshotHistory) -> InvariantResult {
        let mut seen: HashMap<TurnId, TurnStatus> = HashMap::new();

        for (index, snapshot) in history.snapshots.iter().enumerate() {
            for record in snapshot.records() {
                if let Some(previous) = seen.insert(record.turn_id, record.status)
                    && !StatusTracker::is_valid_transition(previous, record.status)
                {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "snapshot {index}: turn {} regressed {previous} → {}",
                            record.turn_id, record.status
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A turn, once published, appears in every later snapshot.
///
/// Records survive restarts; only dropping the engine releases them.
pub struct TurnsRetained;

impl Invariant for TurnsRetained {
    fn name(&self) -> &'static str {
        "turns_retained"
    }

    fn check(&self, history: &SnapshotHistory) -> InvariantResult {
        let mut known: BTreeSet<TurnId> = BTreeSet::new();

        for (index, snapshot) in history.snapshots.iter().enumerate() {
            let present: BTreeSet<TurnId> =
                snapshot.records().iter().map(|r| r.turn_id).collect();
            if let Some(missing) = known.difference(&present).next() {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("snapshot {index}: turn {missing} disappeared"),
                });
            }
            known = present;
        }
        Ok(())
    }
}

/// Text of a finished turn never changes.
///
/// A completed turn may still be invalidated into `Error`, but its text
/// stays as it was.
pub struct TerminalTextStable;

impl Invariant for TerminalTextStable {
    fn name(&self) -> &'static str {
        "terminal_text_stable"
    }

    fn check(&self, history: &SnapshotHistory) -> InvariantResult {
        let mut finished: HashMap<TurnId, &str> = HashMap::new();

        for (index, snapshot) in history.snapshots.iter().enumerate() {
            for record in snapshot.records() {
                if let Some(text) = finished.get(&record.turn_id) {
                    if *text != record.text {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "snapshot {index}: finished turn {} changed {text:?} → {:?}",
                                record.turn_id, record.text
                            ),
                        });
                    }
                } else if record.status.is_terminal() {
                    finished.insert(record.turn_id, &record.text);
                }
            }
        }
        Ok(())
    }
}

/// Only turns from the configured agent are ever buffered.
pub struct SpeakerIsolation;

impl Invariant for SpeakerIsolation {
    fn name(&self) -> &'static str {
        "speaker_isolation"
    }

    fn check(&self, history: &SnapshotHistory) -> InvariantResult {
        let Some(expected) = &history.expected_speaker else {
            return Ok(());
        };

        for (index, snapshot) in history.snapshots.iter().enumerate() {
            if let Some(record) = snapshot.records().into_iter().find(|r| r.speaker_id != *expected)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "snapshot {index}: turn {} from {} (expected {expected})",
                        record.turn_id, record.speaker_id
                    ),
                });
            }
        }
        Ok(())
    }
}

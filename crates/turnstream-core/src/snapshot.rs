//! Snapshot publication.
//!
//! A [`Snapshot`] is an immutable, sorted copy of the buffer handed to the
//! observer. The current in-progress turn is split out so a UI can render it
//! differently (e.g. with a typing cursor).

use serde::Serialize;
use turnstream_proto::TurnId;

use crate::{TurnBuffer, TurnRecord, TurnStatus};

/// Externally observable transcript state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// All turns except the current in-progress one, ascending by turn id.
    pub turns: Vec<TurnRecord>,
    /// Most recent `InProgress` turn, if any.
    pub in_progress: Option<TurnRecord>,
}

impl Snapshot {
    /// Copy the buffer into a snapshot.
    ///
    /// The in-progress turn with the highest id is the current one; any
    /// other `InProgress` record (another speaker's) stays in `turns`.
    pub fn capture(buffer: &TurnBuffer) -> Self {
        let current = buffer
            .iter()
            .filter(|record| record.status == TurnStatus::InProgress)
            .map(|record| record.turn_id)
            .max();

        let mut turns = Vec::with_capacity(buffer.len());
        let mut in_progress = None;
        for record in buffer.iter() {
            if Some(record.turn_id) == current {
                in_progress = Some(record.clone());
            } else {
                turns.push(record.clone());
            }
        }

        Self { turns, in_progress }
    }

    /// Every record, including the in-progress one, ascending by turn id.
    pub fn records(&self) -> Vec<&TurnRecord> {
        let mut records: Vec<&TurnRecord> = self.turns.iter().chain(&self.in_progress).collect();
        records.sort_by_key(|record| record.turn_id);
        records
    }

    /// Record for `turn_id`, wherever it sits.
    pub fn get(&self, turn_id: TurnId) -> Option<&TurnRecord> {
        self.in_progress
            .as_ref()
            .filter(|record| record.turn_id == turn_id)
            .or_else(|| self.turns.iter().find(|record| record.turn_id == turn_id))
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.turns.len() + usize::from(self.in_progress.is_some())
    }

    /// True if the snapshot has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Emits snapshots, suppressing consecutive duplicates.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPublisher {
    last_emission: Option<Snapshot>,
}

impl SnapshotPublisher {
    /// Publisher that has emitted nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `buffer` if it differs from the last emission.
    pub fn publish(&mut self, buffer: &TurnBuffer) -> Option<Snapshot> {
        let snapshot = Snapshot::capture(buffer);
        if self.last_emission.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last_emission = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Snapshot of `buffer`, emitted unconditionally.
    pub fn flush(&mut self, buffer: &TurnBuffer) -> Snapshot {
        let snapshot = Snapshot::capture(buffer);
        self.last_emission = Some(snapshot.clone());
        snapshot
    }

    /// Last emitted snapshot.
    pub fn last_emission(&self) -> Option<&Snapshot> {
        self.last_emission.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use turnstream_proto::WireEvent;

    use super::*;

    fn buffer_with(events: &[WireEvent]) -> TurnBuffer {
        let mut buffer = TurnBuffer::new();
        for event in events {
            buffer.apply(event);
        }
        buffer
    }

    #[test]
    fn in_progress_turn_is_split_out() {
        let buffer = buffer_with(&[
            WireEvent::delta("333", 1, 1, "Hi").finished(),
            WireEvent::delta("333", 2, 1, "How"),
        ]);
        let snapshot = Snapshot::capture(&buffer);

        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(snapshot.in_progress.as_ref().map(|r| r.turn_id), Some(2));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(2).map(|r| r.text.as_str()), Some("How"));
    }

    #[test]
    fn records_are_sorted() {
        let buffer = buffer_with(&[
            WireEvent::delta("333", 3, 1, "c").finished(),
            WireEvent::delta("333", 4, 1, "d"),
            WireEvent::delta("333", 1, 1, "a").finished(),
        ]);
        let snapshot = Snapshot::capture(&buffer);
        let ids: Vec<_> = snapshot.records().iter().map(|r| r.turn_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn identical_snapshot_is_suppressed() {
        let buffer = buffer_with(&[WireEvent::delta("333", 1, 1, "Hi")]);
        let mut publisher = SnapshotPublisher::new();

        assert!(publisher.publish(&buffer).is_some());
        assert!(publisher.publish(&buffer).is_none());
        assert_eq!(publisher.flush(&buffer), Snapshot::capture(&buffer));
    }

    #[test]
    fn empty_buffer_gives_empty_snapshot() {
        let snapshot = Snapshot::capture(&TurnBuffer::new());
        assert!(snapshot.is_empty());
        assert!(snapshot.in_progress.is_none());
    }
}

//! Observable history for invariant checking.

use turnstream_core::{Snapshot, SpeakerId};

/// Snapshots in publication order.
///
/// Invariants operate on the recorded history rather than live state, so a
/// check sees exactly what the observer saw.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHistory {
    /// Agent identity the engine was configured with. `None` skips speaker
    /// checks.
    pub expected_speaker: Option<SpeakerId>,
    /// Published snapshots, oldest first.
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotHistory {
    /// History for an engine configured with `expected_speaker`.
    pub fn new(expected_speaker: Option<SpeakerId>) -> Self {
        Self { expected_speaker, snapshots: Vec::new() }
    }

    /// Append a published snapshot.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    /// Most recent snapshot.
    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True if nothing was published.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

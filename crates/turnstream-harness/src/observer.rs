//! Observer that records every snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use turnstream_core::{Snapshot, SpeakerId};
use turnstream_engine::Observer;

use crate::SnapshotHistory;

/// Records published snapshots for later inspection.
///
/// Clones share the same log, so a test keeps one clone while the engine
/// (possibly on another task) owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl RecordingObserver {
    /// Observer with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Snapshot>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of every recorded snapshot, oldest first.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.lock().clone()
    }

    /// Most recent snapshot.
    pub fn last(&self) -> Option<Snapshot> {
        self.lock().last().cloned()
    }

    /// Number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing was published yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Recorded snapshots as an invariant history.
    pub fn history(&self, expected_speaker: Option<SpeakerId>) -> SnapshotHistory {
        SnapshotHistory { expected_speaker, snapshots: self.snapshots() }
    }
}

impl Observer for RecordingObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.lock().push(snapshot.clone());
    }
}

//! Downstream snapshot consumer.

use turnstream_core::Snapshot;

/// Receives every published snapshot.
///
/// Called synchronously on the engine task, in publication order. A slow
/// observer delays the next frame.
pub trait Observer: Send {
    /// Handle one snapshot.
    fn on_snapshot(&mut self, snapshot: &Snapshot);
}

impl<F> Observer for F
where
    F: FnMut(&Snapshot) + Send,
{
    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self(snapshot);
    }
}

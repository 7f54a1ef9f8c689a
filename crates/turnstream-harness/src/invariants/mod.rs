//! Transcript properties checked over every snapshot an observer received.
//!
//! A test records the snapshots through [`RecordingObserver`](crate::RecordingObserver),
//! turns them into a [`SnapshotHistory`] and hands that to an
//! [`InvariantRegistry`]. Each check walks the whole history, so a violation
//! names the snapshot index where the transcript went wrong.
//!
//! ```ignore
//! let history = observer.history(Some(agent));
//! InvariantRegistry::standard().assert_all(&history, "after stall recovery");
//! ```

mod checks;
mod history;

pub use checks::{
    SortedTurns, SpeakerIsolation, StatusMonotonicity, TerminalTextStable, TurnsRetained,
};
pub use history::SnapshotHistory;

/// Outcome of a single check.
pub type InvariantResult = Result<(), Violation>;

/// A transcript property that failed, and where.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Check that failed.
    pub invariant: &'static str,
    /// Offending snapshot and turn.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of a snapshot history.
pub trait Invariant: Send + Sync {
    /// Short name used in violation reports.
    fn name(&self) -> &'static str;

    /// Walk `history` and report the first snapshot that breaks the property.
    fn check(&self, history: &SnapshotHistory) -> InvariantResult;
}

/// Set of checks run together against one history.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// No checks registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted order, forward-only status, retained turns, frozen terminal
    /// text and a single speaker.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SortedTurns);
        registry.add(StatusMonotonicity);
        registry.add(TurnsRetained);
        registry.add(TerminalTextStable);
        registry.add(SpeakerIsolation);
        registry
    }

    /// Register one more check.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.checks.push(Box::new(invariant));
    }

    /// Names of the registered checks, in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Run every check; all failures are collected, not just the first.
    pub fn check_all(&self, history: &SnapshotHistory) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.checks.iter().filter_map(|check| check.check(history).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Panic listing every failure. For tests and fuzz targets.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, history: &SnapshotHistory, context: &str) {
        if let Err(violations) = self.check_all(history) {
            let report: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("transcript broken {context}:\n  {}", report.join("\n  "));
        }
    }
}

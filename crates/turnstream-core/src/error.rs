//! Error types for the transcript core.
//!
//! Per-frame problems never surface as errors: decode failures are logged
//! and counted, duplicates are [`crate::ApplyOutcome::Stale`]. The only
//! fatal error is an invalid configuration at construction.

use std::time::Duration;

use thiserror::Error;

/// Engine could not be constructed from its configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// No agent speaker identity configured
    #[error("expected speaker id is empty")]
    MissingSpeaker,

    /// Stall pattern would match every diagnostic
    #[error("stall pattern is empty")]
    EmptyStallPattern,

    /// Restart delay outside the accepted range
    #[error("restart delay {delay:?} out of range (max {max:?})")]
    RestartDelayOutOfRange {
        /// Configured delay
        delay: Duration,
        /// Largest accepted delay
        max: Duration,
    },
}

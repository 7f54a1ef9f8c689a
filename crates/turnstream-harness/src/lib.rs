//! Deterministic test harness for the transcript engine.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference transcript. Events are applied to
//! both the model and the real [`TurnBuffer`](turnstream_core::TurnBuffer)
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties over the history of
//! published snapshots. Use [`InvariantRegistry::standard()`] for the common
//! set.
//!
//! # Faults
//!
//! [`FlakyTransport`] refuses subscriptions on demand and [`ChaosFeed`]
//! duplicates and reorders deliveries from a fixed seed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod frames;
pub mod invariants;
pub mod model;
pub mod observer;
pub mod transport;

pub use frames::{TurnScript, encode};
pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, SnapshotHistory, SortedTurns,
    SpeakerIsolation, StatusMonotonicity, TerminalTextStable, TurnsRetained, Violation,
};
pub use model::{ModelTranscript, ModelTurn, Operation, SmallText};
pub use observer::RecordingObserver;
pub use transport::{ChaosFeed, FlakyError, FlakyTransport};

//! Transcript assembly core
//!
//! Pure state machines that turn decoded stream messages into an ordered,
//! continuously updated transcript. No I/O, no timers, no async: time is
//! passed in by the caller and side effects are returned as
//! [`ControllerAction`]s for a driver to execute.
//!
//! # Components
//!
//! - [`TurnBuffer`]: owns turn id → [`TurnRecord`], applies fragments with
//!   sequence-number deduplication
//! - [`StatusTracker`]: lifecycle rules for [`TurnStatus`]
//! - [`SnapshotPublisher`]: sorted, change-suppressed [`Snapshot`]s
//! - [`EngineState`]: per-session aggregate of the above
//! - [`Controller`]: start/stop/restart state machine with stall recovery

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod snapshot;
pub mod state;
pub mod status;
pub mod turn;

pub use buffer::{ApplyOutcome, TurnBuffer};
pub use config::EngineConfig;
pub use controller::{Controller, ControllerAction, ControllerStats, TransportSignal};
pub use error::ConstructionError;
pub use snapshot::{Snapshot, SnapshotPublisher};
pub use state::{EngineState, RunState};
pub use status::StatusTracker;
pub use turn::{TurnRecord, TurnStatus};
pub use turnstream_proto::{FrameMode, SpeakerId, TurnFault, TurnId, WireEvent};

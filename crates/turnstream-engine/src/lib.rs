//! Transcript engine runtime
//!
//! Drives the Sans-IO [`Controller`](turnstream_core::Controller) over a real
//! message transport. The runtime executes controller actions: it opens and
//! drops subscriptions, arms the restart timer, and hands snapshots to the
//! observer.
//!
//! # Components
//!
//! - [`Transport`] / [`Subscription`]: seam to the host messaging SDK
//! - [`Observer`]: single downstream consumer of snapshots
//! - [`Engine`]: single-task event loop
//! - [`EngineHandle`]: a spawned engine; stopping it returns an
//!   [`EngineReport`]
//! - [`EngineSlot`]: owner that holds at most one engine per session
//! - [`ChannelTransport`]: in-process transport fed by host callbacks

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod engine;
mod error;
mod observer;
mod session;
mod transport;

pub use channel::{ChannelSubscription, ChannelTransport};
pub use engine::{Engine, Step};
pub use error::{EngineError, TransportError};
pub use observer::Observer;
pub use session::{EngineHandle, EngineReport, EngineSlot};
pub use transport::{Subscription, Transport, TransportEvent};
pub use turnstream_core::{
    ConstructionError, ControllerStats, EngineConfig, FrameMode, RunState, Snapshot, SpeakerId,
    TransportSignal, TurnRecord, TurnStatus,
};

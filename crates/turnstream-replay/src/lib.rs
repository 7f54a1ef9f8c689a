//! Turnstream capture replay.
//!
//! Loads a JSON-lines capture of transport deliveries and runs it through
//! the transcript engine, producing the transcript an observer would have
//! seen. Used to reproduce field reports offline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
mod error;
mod replay;

pub use capture::CaptureEntry;
pub use error::ReplayError;
pub use replay::{ReplayOutcome, replay, write_json, write_text};

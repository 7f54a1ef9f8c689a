//! Replay error types.

use std::{io, path::PathBuf};

use thiserror::Error;
use turnstream_engine::EngineError;

/// Errors that can occur while replaying a capture.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Capture file could not be read.
    #[error("failed to read capture {path}: {source}")]
    Io {
        /// Capture path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A capture line is not a valid entry.
    ///
    /// Fatal: a capture that cannot be parsed cannot be replayed faithfully.
    #[error("line {line}: invalid capture entry: {source}")]
    Entry {
        /// 1-based line number
        line: usize,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A frame entry carries a payload that is not valid hex.
    #[error("line {line}: invalid frame payload: {source}")]
    Payload {
        /// 1-based line number
        line: usize,
        /// Hex error
        #[source]
        source: hex::FromHexError,
    },

    /// The engine failed or could not be constructed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The transcript could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    /// The transcript could not be serialized.
    #[error("failed to serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
}

//! Capture files.
//!
//! A capture is a JSON-lines recording of everything a transport delivered
//! during one session, one entry per line:
//!
//! ```text
//! {"kind":"frame","speaker":"333","hex":"7b2276..."}
//! {"kind":"diagnostic","message":"Message service is not running"}
//! {"kind":"stall"}
//! {"kind":"turn_aborted","turn_id":4}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::{fs, io::BufRead, path::Path};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use turnstream_engine::{SpeakerId, TransportEvent, TransportSignal};

use crate::ReplayError;

/// One recorded transport delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureEntry {
    /// Stream message with a hex-encoded payload.
    Frame {
        /// Sender of the message
        speaker: String,
        /// Payload bytes as hex
        hex: String,
    },
    /// Transport diagnostic text.
    Diagnostic {
        /// Diagnostic message
        message: String,
    },
    /// Explicit stall signal.
    Stall,
    /// The agent aborted a turn.
    TurnAborted {
        /// Aborted turn
        turn_id: u64,
    },
}

impl CaptureEntry {
    /// Entry recording a frame.
    pub fn frame(speaker: impl Into<String>, payload: &[u8]) -> Self {
        Self::Frame { speaker: speaker.into(), hex: hex::encode(payload) }
    }

    /// Convert to the event a transport would deliver.
    ///
    /// # Errors
    ///
    /// - `ReplayError::Payload` if a frame payload is not valid hex
    pub fn into_event(self, line: usize) -> Result<TransportEvent, ReplayError> {
        let event = match self {
            Self::Frame { speaker, hex } => {
                let payload =
                    hex::decode(hex.trim()).map_err(|source| ReplayError::Payload { line, source })?;
                TransportEvent::Frame {
                    speaker_id: SpeakerId::from(speaker),
                    payload: Bytes::from(payload),
                }
            },
            Self::Diagnostic { message } => {
                TransportEvent::Signal(TransportSignal::Diagnostic { message })
            },
            Self::Stall => TransportEvent::Signal(TransportSignal::Stalled),
            Self::TurnAborted { turn_id } => {
                TransportEvent::Signal(TransportSignal::TurnAborted { turn_id })
            },
        };
        Ok(event)
    }
}

/// Parse a capture from a reader.
///
/// # Errors
///
/// - `ReplayError::Output` if reading fails
/// - `ReplayError::Entry` / `ReplayError::Payload` for the first bad line
pub fn parse(reader: impl BufRead) -> Result<Vec<TransportEvent>, ReplayError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let entry: CaptureEntry = serde_json::from_str(trimmed)
            .map_err(|source| ReplayError::Entry { line: line_no, source })?;
        events.push(entry.into_event(line_no)?);
    }
    Ok(events)
}

/// Read and parse a capture file.
///
/// # Errors
///
/// - `ReplayError::Io` if the file cannot be read
/// - `ReplayError::Entry` / `ReplayError::Payload` for the first bad line
pub fn read(path: &Path) -> Result<Vec<TransportEvent>, ReplayError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ReplayError::Io { path: path.to_path_buf(), source })?;
    let events = parse(contents.as_bytes())?;
    tracing::debug!(path = %path.display(), events = events.len(), "capture loaded");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_entry_kind() {
        let capture = r#"
# session 1
{"kind":"frame","speaker":"333","hex":"6869"}
{"kind":"diagnostic","message":"rtm down"}

{"kind":"stall"}
{"kind":"turn_aborted","turn_id":4}
"#;
        let events = parse(capture.as_bytes()).expect("parse");
        assert_eq!(events, vec![
            TransportEvent::Frame {
                speaker_id: SpeakerId::from("333"),
                payload: Bytes::from_static(b"hi"),
            },
            TransportEvent::Signal(TransportSignal::Diagnostic { message: "rtm down".into() }),
            TransportEvent::Signal(TransportSignal::Stalled),
            TransportEvent::Signal(TransportSignal::TurnAborted { turn_id: 4 }),
        ]);
    }

    #[test]
    fn bad_hex_reports_line() {
        let capture = "{\"kind\":\"stall\"}\n{\"kind\":\"frame\",\"speaker\":\"1\",\"hex\":\"xyz\"}\n";
        let error = parse(capture.as_bytes()).expect_err("bad hex");
        assert!(matches!(error, ReplayError::Payload { line: 2, .. }));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let error = parse("{\"kind\":\"audio\"}".as_bytes()).expect_err("unknown kind");
        assert!(matches!(error, ReplayError::Entry { line: 1, .. }));
    }

    #[test]
    fn frame_entry_serializes_as_hex() {
        let entry = CaptureEntry::frame("333", b"hi");
        let json = serde_json::to_string(&entry).expect("serialize");
        assert_eq!(json, r#"{"kind":"frame","speaker":"333","hex":"6869"}"#);
    }
}

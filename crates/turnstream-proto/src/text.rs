//! TEXT framing.
//!
//! Each frame is a single UTF-8 JSON object:
//!
//! ```json
//! {"version":1,"turn_id":1,"seq":2,"text":"lo","final":true}
//! ```
//!
//! `version` defaults to 1, `text` to the empty string and the boolean flags to
//! `false`. Unknown fields are ignored so newer agents can add metadata
//! without breaking older decoders.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    LegacyFlags, SpeakerId, TurnFault, TurnId, WireEvent,
    errors::{DecodeError, Result},
};

/// Version accepted by the TEXT decoder.
pub const TEXT_VERSION: u8 = 1;

fn default_version() -> u8 {
    TEXT_VERSION
}

/// Serialized shape of a TEXT frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFrame {
    /// Framing version.
    #[serde(default = "default_version")]
    pub version: u8,
    /// Turn id.
    pub turn_id: TurnId,
    /// Per-turn sequence number.
    pub seq: u64,
    /// Text fragment.
    #[serde(default)]
    pub text: String,
    /// Last frame of the turn.
    #[serde(default, rename = "final")]
    pub is_final: bool,
    /// Full-text replacement (requires `final`).
    #[serde(default)]
    pub replace: bool,
    /// Terminal fault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<TurnFault>,
}

impl TextFrame {
    /// Frame carrying the same content as `event`.
    pub fn from_event(event: &WireEvent) -> Self {
        Self {
            version: TEXT_VERSION,
            turn_id: event.turn_id,
            seq: event.seq,
            text: event.text.clone(),
            is_final: event.is_final,
            replace: event.replace,
            fault: event.fault,
        }
    }

    /// Serialize to JSON bytes.
    ///
    /// # Errors
    ///
    /// - `DecodeError::Malformed` if serialization fails
    pub fn encode(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// Decode a TEXT frame.
pub(crate) fn decode(speaker_id: &SpeakerId, raw: &[u8]) -> Result<WireEvent> {
    // Parse from str rather than bytes so invalid UTF-8 is reported as such
    // instead of as a JSON syntax error.
    let json = std::str::from_utf8(raw)
        .map_err(|_| DecodeError::Malformed("frame is not valid UTF-8".to_owned()))?;

    let frame: TextFrame =
        serde_json::from_str(json).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if frame.version != TEXT_VERSION {
        return Err(DecodeError::UnsupportedVersion(frame.version));
    }

    if frame.seq == 0 {
        return Err(DecodeError::ZeroSequence { turn_id: frame.turn_id });
    }

    let event = WireEvent {
        speaker_id: speaker_id.clone(),
        turn_id: frame.turn_id,
        seq: frame.seq,
        text: frame.text,
        is_final: frame.is_final,
        replace: frame.replace,
        fault: frame.fault,
    };

    // Both framings share the same flag rules.
    LegacyFlags::from_event(&event).validate(event.turn_id)?;

    Ok(event)
}

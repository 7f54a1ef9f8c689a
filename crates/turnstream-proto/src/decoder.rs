//! Frame decoder bound to a single framing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    SpeakerId, WireEvent,
    errors::{DecodeError, Result},
    legacy, text,
};

/// Maximum accepted stream message size (64 KiB).
///
/// Transports cap stream messages well below this; anything larger is
/// treated as garbage rather than buffered.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Framing used by the remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameMode {
    /// JSON text frames.
    #[default]
    Text,
    /// Fixed binary header + text.
    Legacy,
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for FrameMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown frame mode '{other}' (expected 'text' or 'legacy')")),
        }
    }
}

/// Stateless decoder for one [`FrameMode`].
///
/// The framing is fixed at construction; there is no sniffing of the payload
/// to guess which framing a frame uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    mode: FrameMode,
}

impl FrameDecoder {
    /// Create a decoder for `mode`.
    pub fn new(mode: FrameMode) -> Self {
        Self { mode }
    }

    /// Framing this decoder accepts.
    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    /// Decode one stream message sent by `speaker_id`.
    ///
    /// # Errors
    ///
    /// - `DecodeError::Empty` for a zero-length payload
    /// - `DecodeError::PayloadTooLarge` above [`MAX_FRAME_SIZE`]
    /// - any framing-specific error (see [`DecodeError`])
    pub fn decode(&self, speaker_id: &SpeakerId, raw: &[u8]) -> Result<WireEvent> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }

        if raw.len() > MAX_FRAME_SIZE {
            return Err(DecodeError::PayloadTooLarge { size: raw.len(), max: MAX_FRAME_SIZE });
        }

        match self.mode {
            FrameMode::Text => text::decode(speaker_id, raw),
            FrameMode::Legacy => legacy::decode(speaker_id, raw),
        }
    }
}

//! Decode errors.
//!
//! Every malformed or unrecognized frame maps to exactly one [`DecodeError`]
//! variant. Errors are plain data (`Clone + Eq`) so they can be counted,
//! compared in tests and logged without holding on to the offending buffer.

use thiserror::Error;

use crate::TurnId;

/// Result alias for decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors produced while decoding a stream message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload contained no bytes.
    #[error("empty frame")]
    Empty,

    /// Buffer is shorter than the fixed header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes received
        actual: usize,
    },

    /// Header magic does not identify a legacy frame.
    #[error("invalid magic number: {0:#06x}")]
    InvalidMagic(u16),

    /// Framing version is not supported by this decoder.
    #[error("unsupported framing version: {0}")]
    UnsupportedVersion(u8),

    /// Declared text length disagrees with the bytes that follow the header.
    #[error("length mismatch: header declares {declared} bytes, frame carries {actual}")]
    LengthMismatch {
        /// Length declared in the header
        declared: usize,
        /// Length actually present
        actual: usize,
    },

    /// Payload exceeds [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the rejected payload
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// TEXT frame is not a valid JSON object of the expected shape.
    #[error("malformed text frame: {0}")]
    Malformed(String),

    /// Fragment is not valid UTF-8.
    #[error("turn {turn_id}: fragment is not valid UTF-8")]
    InvalidUtf8 {
        /// Turn the fragment belonged to
        turn_id: TurnId,
    },

    /// Sequence number 0 is reserved.
    #[error("turn {turn_id}: sequence number 0 is reserved")]
    ZeroSequence {
        /// Turn the frame referenced
        turn_id: TurnId,
    },

    /// Flag combination is not meaningful.
    #[error("turn {turn_id}: invalid flags {flags:#04x}")]
    InvalidFlags {
        /// Turn the frame referenced
        turn_id: TurnId,
        /// Raw flag byte (TEXT frames report the equivalent legacy bits)
        flags: u8,
    },
}

impl DecodeError {
    /// Turn to fault for this rejection.
    ///
    /// Only content failures (invalid UTF-8) name a turn. Header-level
    /// rejections return `None` even when they carry the parsed id: a zero
    /// sequence or bad flag combination says nothing about the turn's text,
    /// so the turn is left as it was.
    pub fn turn_id(&self) -> Option<TurnId> {
        match self {
            Self::InvalidUtf8 { turn_id } => Some(*turn_id),
            Self::Empty
            | Self::FrameTooShort { .. }
            | Self::InvalidMagic(_)
            | Self::UnsupportedVersion(_)
            | Self::LengthMismatch { .. }
            | Self::PayloadTooLarge { .. }
            | Self::Malformed(_)
            | Self::ZeroSequence { .. }
            | Self::InvalidFlags { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_content_errors_fault_a_turn() {
        assert_eq!(DecodeError::InvalidUtf8 { turn_id: 7 }.turn_id(), Some(7));

        // A frame with a bad sequence or flags is rejected, but says nothing
        // reliable about the turn's content.
        assert_eq!(DecodeError::ZeroSequence { turn_id: 7 }.turn_id(), None);
        assert_eq!(DecodeError::InvalidFlags { turn_id: 7, flags: 0x02 }.turn_id(), None);
        assert_eq!(DecodeError::Empty.turn_id(), None);
        assert_eq!(DecodeError::InvalidMagic(0xFFFF).turn_id(), None);
    }

    #[test]
    fn display_includes_context() {
        let err = DecodeError::LengthMismatch { declared: 10, actual: 3 };
        assert_eq!(err.to_string(), "length mismatch: header declares 10 bytes, frame carries 3");

        let err = DecodeError::InvalidFlags { turn_id: 3, flags: 0x02 };
        assert_eq!(err.to_string(), "turn 3: invalid flags 0x02");
    }
}

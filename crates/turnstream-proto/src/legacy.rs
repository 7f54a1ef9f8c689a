//! Legacy binary framing.
//!
//! Frames are a fixed 14-byte header (Big Endian) followed by the UTF-8 text
//! fragment. The header is parsed zero-copy straight from the transport
//! buffer.
//!
//! ```text
//! 0..2   magic     0x5453 ("TS")
//! 2      version   0x01
//! 3      flags     FINAL | REPLACE | INTERRUPTED | INVALIDATED
//! 4..8   turn_id   u32
//! 8..12  seq       u32
//! 12..14 text_len  u16
//! 14..   text      exactly text_len bytes
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    SpeakerId, TurnFault, TurnId, WireEvent,
    errors::{DecodeError, Result},
};

/// Frame flag bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegacyFlags(u8);

impl LegacyFlags {
    /// Last frame of the turn.
    pub const FINAL: u8 = 0b0000_0001;
    /// Text replaces the accumulated text (requires `FINAL`).
    pub const REPLACE: u8 = 0b0000_0010;
    /// Turn was interrupted.
    pub const INTERRUPTED: u8 = 0b0000_0100;
    /// Turn was invalidated by the agent.
    pub const INVALIDATED: u8 = 0b0000_1000;

    const KNOWN: u8 = Self::FINAL | Self::REPLACE | Self::INTERRUPTED | Self::INVALIDATED;

    /// Flags from the raw header byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw header byte.
    pub fn to_byte(self) -> u8 {
        self.0
    }

    /// Flags describing an event.
    pub fn from_event(event: &WireEvent) -> Self {
        let mut byte = 0;
        if event.is_final {
            byte |= Self::FINAL;
        }
        if event.replace {
            byte |= Self::REPLACE;
        }
        match event.fault {
            Some(TurnFault::Interrupted) => byte |= Self::INTERRUPTED,
            Some(TurnFault::Invalidated) => byte |= Self::INVALIDATED,
            None => {},
        }
        Self(byte)
    }

    /// Final frame of the turn.
    pub fn is_final(self) -> bool {
        self.0 & Self::FINAL != 0
    }

    /// Full-text replacement.
    pub fn is_replace(self) -> bool {
        self.0 & Self::REPLACE != 0
    }

    /// Fault carried by the frame.
    ///
    /// Only meaningful after [`Self::validate`] succeeded.
    pub fn fault(self) -> Option<TurnFault> {
        if self.0 & Self::INVALIDATED != 0 {
            Some(TurnFault::Invalidated)
        } else if self.0 & Self::INTERRUPTED != 0 {
            Some(TurnFault::Interrupted)
        } else {
            None
        }
    }

    /// Reject unknown bits and contradictory combinations.
    ///
    /// # Errors
    ///
    /// - `DecodeError::InvalidFlags` for unknown bits, `REPLACE` without
    ///   `FINAL`, or both fault bits set
    pub fn validate(self, turn_id: TurnId) -> Result<()> {
        let both_faults = Self::INTERRUPTED | Self::INVALIDATED;
        let invalid = self.0 & !Self::KNOWN != 0
            || (self.is_replace() && !self.is_final())
            || self.0 & both_faults == both_faults;

        if invalid { Err(DecodeError::InvalidFlags { turn_id, flags: self.0 }) } else { Ok(()) }
    }
}

/// Fixed 14-byte legacy header (Big Endian).
///
/// Fields are raw byte arrays so every 14-byte pattern is a valid value and
/// the header can be cast from untrusted transport bytes.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct LegacyHeader {
    magic: [u8; 2],
    version: u8,
    flags: u8,
    turn_id: [u8; 4],
    seq: [u8; 4],
    text_len: [u8; 2],
}

impl LegacyHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 14;

    /// Magic number: "TS" in ASCII.
    pub const MAGIC: u16 = 0x5453;

    /// Current legacy framing version.
    pub const VERSION: u8 = 0x01;

    /// Parse the header prefix of a frame (zero-copy).
    ///
    /// Validation order is cheapest first: size, magic, version.
    ///
    /// # Errors
    ///
    /// - `DecodeError::FrameTooShort` if fewer than 14 bytes are present
    /// - `DecodeError::InvalidMagic` if the magic number is wrong
    /// - `DecodeError::UnsupportedVersion` for any version other than 1
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| DecodeError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if header.magic() != Self::MAGIC {
            return Err(DecodeError::InvalidMagic(header.magic()));
        }

        if header.version != Self::VERSION {
            return Err(DecodeError::UnsupportedVersion(header.version));
        }

        Ok(header)
    }

    /// Protocol magic.
    pub fn magic(&self) -> u16 {
        u16::from_be_bytes(self.magic)
    }

    /// Framing version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Flag bitfield.
    pub fn flags(&self) -> LegacyFlags {
        LegacyFlags::from_byte(self.flags)
    }

    /// Turn id.
    pub fn turn_id(&self) -> TurnId {
        TurnId::from(u32::from_be_bytes(self.turn_id))
    }

    /// Per-turn sequence number.
    pub fn seq(&self) -> u64 {
        u64::from(u32::from_be_bytes(self.seq))
    }

    /// Declared length of the text that follows.
    pub fn text_len(&self) -> usize {
        usize::from(u16::from_be_bytes(self.text_len))
    }

    /// Serialize header to bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }
}

impl std::fmt::Debug for LegacyHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyHeader")
            .field("magic", &format!("{:#06x}", self.magic()))
            .field("version", &self.version())
            .field("flags", &self.flags())
            .field("turn_id", &self.turn_id())
            .field("seq", &self.seq())
            .field("text_len", &self.text_len())
            .finish()
    }
}

/// Owned legacy frame, used to produce frames for tooling and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFrame {
    /// Turn id (must fit in 32 bits on the wire).
    pub turn_id: u32,
    /// Sequence number (must fit in 32 bits on the wire).
    pub seq: u32,
    /// Flag bitfield.
    pub flags: LegacyFlags,
    /// Text fragment.
    pub text: String,
}

impl LegacyFrame {
    /// Encode into `[header][text]`.
    ///
    /// # Errors
    ///
    /// - `DecodeError::PayloadTooLarge` if the text does not fit the 16-bit
    ///   length field
    pub fn encode(&self) -> Result<Bytes> {
        let text = self.text.as_bytes();
        let text_len = u16::try_from(text.len()).map_err(|_| DecodeError::PayloadTooLarge {
            size: text.len(),
            max: usize::from(u16::MAX),
        })?;

        let mut buf = BytesMut::with_capacity(LegacyHeader::SIZE + text.len());
        buf.put_u16(LegacyHeader::MAGIC);
        buf.put_u8(LegacyHeader::VERSION);
        buf.put_u8(self.flags.to_byte());
        buf.put_u32(self.turn_id);
        buf.put_u32(self.seq);
        buf.put_u16(text_len);
        buf.put_slice(text);
        Ok(buf.freeze())
    }
}

/// Decode a legacy frame.
pub(crate) fn decode(speaker_id: &SpeakerId, raw: &[u8]) -> Result<WireEvent> {
    let header = LegacyHeader::from_bytes(raw)?;
    let body = &raw[LegacyHeader::SIZE..];

    if header.text_len() != body.len() {
        return Err(DecodeError::LengthMismatch { declared: header.text_len(), actual: body.len() });
    }

    let turn_id = header.turn_id();
    if header.seq() == 0 {
        return Err(DecodeError::ZeroSequence { turn_id });
    }

    let flags = header.flags();
    flags.validate(turn_id)?;

    let text = std::str::from_utf8(body).map_err(|_| DecodeError::InvalidUtf8 { turn_id })?;

    Ok(WireEvent {
        speaker_id: speaker_id.clone(),
        turn_id,
        seq: header.seq(),
        text: text.to_owned(),
        is_final: flags.is_final(),
        replace: flags.is_replace(),
        fault: flags.fault(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(turn_id: u32, seq: u32, flags: u8, text: &str) -> Bytes {
        LegacyFrame { turn_id, seq, flags: LegacyFlags::from_byte(flags), text: text.to_owned() }
            .encode()
            .expect("encode")
    }

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<LegacyHeader>(), LegacyHeader::SIZE);
    }

    #[test]
    fn decode_final_delta() {
        let raw = frame(1, 2, LegacyFlags::FINAL, "lo");
        let event = decode(&SpeakerId::from("333"), &raw).expect("decode");

        assert_eq!(event.turn_id, 1);
        assert_eq!(event.seq, 2);
        assert_eq!(event.text, "lo");
        assert!(event.is_final);
        assert!(!event.replace);
        assert_eq!(event.fault, None);
    }

    #[test]
    fn header_accessors_read_big_endian() {
        let raw = frame(0x0102_0304, 9, LegacyFlags::FINAL | LegacyFlags::REPLACE, "abc");
        let header = LegacyHeader::from_bytes(&raw).expect("parse");

        assert_eq!(header.turn_id(), 0x0102_0304);
        assert_eq!(header.seq(), 9);
        assert_eq!(header.text_len(), 3);
        assert!(header.flags().is_replace());
        assert_eq!(&header.to_bytes()[..], &raw[..LegacyHeader::SIZE]);
    }

    #[test]
    fn reject_short_buffer() {
        let result = LegacyHeader::from_bytes(&[0x54, 0x53, 0x01]);
        assert_eq!(result.err(), Some(DecodeError::FrameTooShort { expected: 14, actual: 3 }));
    }

    #[test]
    fn reject_invalid_magic() {
        let mut raw = frame(1, 1, 0, "x").to_vec();
        raw[0] = 0xFF;
        raw[1] = 0xFF;
        assert_eq!(
            decode(&SpeakerId::from("1"), &raw).err(),
            Some(DecodeError::InvalidMagic(0xFFFF))
        );
    }

    #[test]
    fn reject_unsupported_version() {
        let mut raw = frame(1, 1, 0, "x").to_vec();
        raw[2] = 0x07;
        assert_eq!(
            decode(&SpeakerId::from("1"), &raw).err(),
            Some(DecodeError::UnsupportedVersion(0x07))
        );
    }

    #[test]
    fn reject_truncated_text() {
        let raw = frame(1, 1, 0, "hello");
        let truncated = &raw[..raw.len() - 2];
        assert_eq!(
            decode(&SpeakerId::from("1"), truncated).err(),
            Some(DecodeError::LengthMismatch { declared: 5, actual: 3 })
        );
    }

    #[test]
    fn reject_zero_sequence() {
        let raw = frame(4, 0, 0, "x");
        assert_eq!(
            decode(&SpeakerId::from("1"), &raw).err(),
            Some(DecodeError::ZeroSequence { turn_id: 4 })
        );
    }

    #[test]
    fn reject_replace_without_final() {
        let raw = frame(4, 1, LegacyFlags::REPLACE, "x");
        assert_eq!(
            decode(&SpeakerId::from("1"), &raw).err(),
            Some(DecodeError::InvalidFlags { turn_id: 4, flags: LegacyFlags::REPLACE })
        );
    }

    #[test]
    fn reject_conflicting_faults_and_unknown_bits() {
        let both = LegacyFlags::INTERRUPTED | LegacyFlags::INVALIDATED;
        assert!(matches!(
            decode(&SpeakerId::from("1"), &frame(4, 1, both, "")),
            Err(DecodeError::InvalidFlags { .. })
        ));
        assert!(matches!(
            decode(&SpeakerId::from("1"), &frame(4, 1, 0x80, "")),
            Err(DecodeError::InvalidFlags { .. })
        ));
    }

    #[test]
    fn invalid_utf8_reports_turn() {
        let mut raw = frame(6, 1, 0, "ab").to_vec();
        raw[LegacyHeader::SIZE] = 0xC3;
        raw[LegacyHeader::SIZE + 1] = 0x28;
        let err = decode(&SpeakerId::from("1"), &raw).expect_err("invalid utf-8");
        assert_eq!(err, DecodeError::InvalidUtf8 { turn_id: 6 });
        assert_eq!(err.turn_id(), Some(6));
    }

    #[test]
    fn fault_flags_map_to_turn_fault() {
        let raw = frame(2, 3, LegacyFlags::INVALIDATED, "");
        let event = decode(&SpeakerId::from("1"), &raw).expect("decode");
        assert_eq!(event.fault, Some(TurnFault::Invalidated));

        let raw = frame(2, 3, LegacyFlags::INTERRUPTED, "");
        let event = decode(&SpeakerId::from("1"), &raw).expect("decode");
        assert_eq!(event.fault, Some(TurnFault::Interrupted));
    }
}

//! Turnstream wire protocol
//!
//! Frame decoding for the stream messages a conversational agent emits next to
//! its audio. Each frame carries one fragment of a turn's text together with
//! the turn id, a per-turn sequence number and a completion flag.
//!
//! # Framings
//!
//! Two framings exist and the decoder is bound to exactly one of them at
//! construction time (see [`FrameMode`]):
//!
//! - [`FrameMode::Text`]: one UTF-8 JSON object per frame ([`TextFrame`])
//! - [`FrameMode::Legacy`]: a fixed 14-byte binary header followed by the text
//!   fragment ([`LegacyHeader`], [`LegacyFrame`])
//!
//! Decoding is pure. Malformed input never panics, it yields a
//! [`DecodeError`] so the caller can log and continue.

mod decoder;
pub mod errors;
mod event;
mod legacy;
mod text;

pub use decoder::{FrameDecoder, FrameMode, MAX_FRAME_SIZE};
pub use errors::{DecodeError, Result};
pub use event::{SpeakerId, TurnFault, TurnId, WireEvent};
pub use legacy::{LegacyFlags, LegacyFrame, LegacyHeader};
pub use text::{TEXT_VERSION, TextFrame};

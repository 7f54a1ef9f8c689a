//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use turnstream_proto::{FrameMode, SpeakerId};

use crate::ConstructionError;

/// Delay before resubscribing after a stall.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(50);

/// Largest accepted restart delay. Frames arriving during the restart gap are
/// lost, so the gap is kept short.
pub const MAX_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Diagnostic text the message transport logs when its dispatch path stops
/// while the subscription is still nominally open.
pub const DEFAULT_STALL_PATTERN: &str = "Message service is not running";

/// Engine configuration
///
/// Fixed at construction; an engine never changes framing or agent identity
/// while running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wire framing of incoming frames
    pub mode: FrameMode,
    /// Only frames from this participant are buffered
    pub expected_speaker: SpeakerId,
    /// Delay between a detected stall and the resubscription
    pub restart_delay: Duration,
    /// Substring that marks a transport diagnostic as a stall
    pub stall_pattern: String,
}

impl EngineConfig {
    /// Configuration with default restart delay and stall pattern.
    pub fn new(mode: FrameMode, expected_speaker: impl Into<SpeakerId>) -> Self {
        Self {
            mode,
            expected_speaker: expected_speaker.into(),
            restart_delay: DEFAULT_RESTART_DELAY,
            stall_pattern: DEFAULT_STALL_PATTERN.to_string(),
        }
    }

    /// Override the restart delay.
    #[must_use]
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Override the stall pattern.
    #[must_use]
    pub fn with_stall_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.stall_pattern = pattern.into();
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// - `MissingSpeaker` if the expected speaker is blank
    /// - `EmptyStallPattern` if the stall pattern is blank
    /// - `RestartDelayOutOfRange` if the delay exceeds [`MAX_RESTART_DELAY`]
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.expected_speaker.is_empty() {
            return Err(ConstructionError::MissingSpeaker);
        }
        if self.stall_pattern.trim().is_empty() {
            return Err(ConstructionError::EmptyStallPattern);
        }
        if self.restart_delay > MAX_RESTART_DELAY {
            return Err(ConstructionError::RestartDelayOutOfRange {
                delay: self.restart_delay,
                max: MAX_RESTART_DELAY,
            });
        }
        Ok(())
    }

    /// True if a transport diagnostic reports a stall.
    pub fn is_stall_diagnostic(&self, message: &str) -> bool {
        message.contains(&self.stall_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::new(FrameMode::Text, "333");
        assert_eq!(config.restart_delay, DEFAULT_RESTART_DELAY);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn blank_speaker_rejected() {
        let config = EngineConfig::new(FrameMode::Legacy, " ");
        assert_eq!(config.validate(), Err(ConstructionError::MissingSpeaker));
    }

    #[test]
    fn long_restart_delay_rejected() {
        let config =
            EngineConfig::new(FrameMode::Text, "333").with_restart_delay(Duration::from_secs(6));
        assert!(matches!(
            config.validate(),
            Err(ConstructionError::RestartDelayOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_stall_pattern_rejected() {
        let config = EngineConfig::new(FrameMode::Text, "333").with_stall_pattern("");
        assert_eq!(config.validate(), Err(ConstructionError::EmptyStallPattern));
    }

    #[test]
    fn stall_pattern_matches_substring() {
        let config = EngineConfig::new(FrameMode::Text, "333");
        assert!(config.is_stall_diagnostic("[rtm] error: Message service is not running (code 2)"));
        assert!(!config.is_stall_diagnostic("token will expire"));
    }
}

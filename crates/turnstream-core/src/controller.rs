//! Engine controller state machine.
//!
//! Supervises the subscription lifecycle and recovers from transport stalls.
//! Uses the action pattern: methods take time as input and return actions
//! for the driver to execute. The controller never touches the transport
//! itself.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐  start   ┌─────────┐   stall    ┌────────────┐
//! │ Stopped │─────────>│ Running │───────────>│ Restarting │
//! └─────────┘          └─────────┘            └────────────┘
//!      ↑                 │     ↑    deadline       │
//!      │ stop            │     └───────────────────┘
//!      └─────────────────┘
//! ```
//!
//! A stall schedules exactly one resubscription after the configured delay.
//! A further stall while the restart is pending is ignored, and a refused
//! resubscription stops the controller for good.

use std::{
    collections::HashSet,
    ops::{Add, Sub},
    time::{Duration, Instant},
};

use serde::Serialize;
use turnstream_proto::{FrameDecoder, SpeakerId, TurnId};

use crate::{ApplyOutcome, ConstructionError, EngineConfig, EngineState, RunState, Snapshot};

/// Actions returned by the controller.
///
/// The driver executes these in order:
/// - `Subscribe`: open a transport subscription
/// - `Unsubscribe`: drop the current subscription
/// - `Publish`: hand the snapshot to the observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerAction {
    /// Open a subscription to the transport's frame event
    Subscribe,
    /// Release the current subscription
    Unsubscribe,
    /// Deliver a snapshot to the observer
    Publish(Snapshot),
}

/// Out-of-band notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Transport reports its dispatch path stopped while still subscribed
    Stalled,
    /// Free-form diagnostic text; matched against the stall pattern
    Diagnostic {
        /// Diagnostic text as reported by the transport
        message: String,
    },
    /// Transport gave up on a turn (e.g. its stream was torn down)
    TurnAborted {
        /// Turn that will never complete
        turn_id: TurnId,
    },
}

/// Counters kept by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Frames that changed the transcript
    pub frames_applied: u64,
    /// Duplicate or older frames
    pub frames_stale: u64,
    /// Frames for turns that already ended
    pub frames_sealed: u64,
    /// Frames received while not running
    pub frames_dropped: u64,
    /// Frames that failed to decode
    pub decode_errors: u64,
    /// Frames from participants other than the agent
    pub ignored_speaker: u64,
    /// Completed resubscriptions after a stall
    pub restarts: u64,
}

/// Engine controller
///
/// Owns the per-session [`EngineState`]. Pure state machine: no I/O, no
/// timers. Generic over `Instant` so tests can drive virtual time.
#[derive(Debug, Clone)]
pub struct Controller<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    config: EngineConfig,
    decoder: FrameDecoder,
    state: EngineState,
    /// True while the driver holds a subscription
    subscribed: bool,
    /// When a pending restart resubscribes
    restart_deadline: Option<I>,
    /// Last frame or signal handled
    last_activity: Option<I>,
    /// Foreign speakers already reported at `warn`
    warned_speakers: HashSet<SpeakerId>,
    stats: ControllerStats,
}

impl<I> Controller<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create a stopped controller.
    ///
    /// # Errors
    ///
    /// - `ConstructionError` if the configuration does not validate
    pub fn new(config: EngineConfig) -> Result<Self, ConstructionError> {
        config.validate()?;
        Ok(Self {
            decoder: FrameDecoder::new(config.mode),
            state: EngineState::new(config.mode),
            config,
            subscribed: false,
            restart_deadline: None,
            last_activity: None,
            warned_speakers: HashSet::new(),
            stats: ControllerStats::default(),
        })
    }

    /// Configuration fixed at construction.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-session state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Current lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.state.run_state()
    }

    /// Deadline of the pending restart, if any.
    ///
    /// Drivers arm a timer for this instant and call [`Self::tick`] when it
    /// fires.
    pub fn restart_deadline(&self) -> Option<I> {
        self.restart_deadline
    }

    /// True while the driver is expected to hold a subscription.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Counters.
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Current transcript.
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Start consuming frames.
    ///
    /// No-op while running. During a pending restart the resubscription
    /// happens immediately instead of waiting for the deadline.
    pub fn start(&mut self, now: I) -> Vec<ControllerAction> {
        match self.run_state() {
            RunState::Running => {
                tracing::debug!("start ignored, already running");
                Vec::new()
            },
            RunState::Stopped => {
                tracing::info!(
                    speaker = %self.config.expected_speaker,
                    mode = %self.config.mode,
                    "engine started"
                );
                self.resubscribe(now)
            },
            RunState::Restarting => {
                tracing::info!("start during pending restart, resubscribing now");
                self.stats.restarts += 1;
                self.resubscribe(now)
            },
        }
    }

    /// Stop consuming frames and flush a final snapshot.
    ///
    /// Cancels any pending restart. Safe to call repeatedly; every call
    /// flushes.
    pub fn stop(&mut self) -> Vec<ControllerAction> {
        let mut actions = Vec::with_capacity(2);
        if self.subscribed {
            self.subscribed = false;
            actions.push(ControllerAction::Unsubscribe);
        }
        if self.run_state() != RunState::Stopped {
            tracing::info!(turns = self.state.turns().len(), "engine stopped");
        }
        self.restart_deadline = None;
        self.state.set_run_state(RunState::Stopped);
        actions.push(ControllerAction::Publish(self.state.flush()));
        actions
    }

    /// Process one frame from the transport.
    ///
    /// Frames are dropped unless running, and ignored unless they come from
    /// the configured agent. Decode failures are logged and counted; when the
    /// failing frame names a known turn, that turn is faulted.
    pub fn handle_frame(
        &mut self,
        speaker: &SpeakerId,
        payload: &[u8],
        now: I,
    ) -> Vec<ControllerAction> {
        if self.run_state() != RunState::Running {
            self.stats.frames_dropped += 1;
            tracing::debug!(%speaker, state = %self.run_state(), "frame dropped, engine not running");
            return Vec::new();
        }
        self.last_activity = Some(now);

        if *speaker != self.config.expected_speaker {
            self.stats.ignored_speaker += 1;
            if self.warned_speakers.insert(speaker.clone()) {
                tracing::warn!(
                    %speaker,
                    expected = %self.config.expected_speaker,
                    "ignoring frames from unexpected speaker, check the configured agent id"
                );
            } else {
                tracing::debug!(%speaker, "frame from unexpected speaker ignored");
            }
            return Vec::new();
        }

        let event = match self.decoder.decode(speaker, payload) {
            Ok(event) => event,
            Err(error) => {
                self.stats.decode_errors += 1;
                tracing::warn!(%error, len = payload.len(), "dropping undecodable frame");
                return match error.turn_id() {
                    Some(turn_id) => self.fault_turn(turn_id),
                    None => Vec::new(),
                };
            },
        };

        match self.state.ingest(&event) {
            ApplyOutcome::Applied { turn_id, from, to } => {
                self.stats.frames_applied += 1;
                if from != to {
                    tracing::debug!(turn_id, %from, %to, "turn status changed");
                }
                self.publish()
            },
            ApplyOutcome::Stale { last_seq } => {
                self.stats.frames_stale += 1;
                tracing::trace!(turn_id = event.turn_id, seq = event.seq, last_seq, "stale frame");
                Vec::new()
            },
            ApplyOutcome::Sealed { status } => {
                self.stats.frames_sealed += 1;
                tracing::debug!(turn_id = event.turn_id, %status, "frame for finished turn ignored");
                Vec::new()
            },
            ApplyOutcome::SpeakerConflict => {
                tracing::warn!(turn_id = event.turn_id, %speaker, "turn owned by another speaker");
                Vec::new()
            },
        }
    }

    /// Process an out-of-band transport signal.
    pub fn handle_signal(&mut self, signal: TransportSignal, now: I) -> Vec<ControllerAction> {
        match signal {
            TransportSignal::Stalled => self.on_stall(now),
            TransportSignal::Diagnostic { message } => {
                if self.config.is_stall_diagnostic(&message) {
                    self.on_stall(now)
                } else {
                    tracing::debug!(%message, "transport diagnostic");
                    Vec::new()
                }
            },
            TransportSignal::TurnAborted { turn_id } => {
                if self.run_state() == RunState::Stopped {
                    return Vec::new();
                }
                tracing::debug!(turn_id, "transport aborted turn");
                self.fault_turn(turn_id)
            },
        }
    }

    /// Process timers. Resubscribes once the restart deadline has passed.
    pub fn tick(&mut self, now: I) -> Vec<ControllerAction> {
        match self.restart_deadline {
            Some(deadline) if self.run_state() == RunState::Restarting && now >= deadline => {
                self.stats.restarts += 1;
                tracing::info!(restarts = self.stats.restarts, "resubscribing after stall");
                self.resubscribe(now)
            },
            _ => Vec::new(),
        }
    }

    /// The transport refused a subscription requested by `Subscribe`.
    ///
    /// Stops the controller without scheduling another retry and flushes
    /// the transcript.
    pub fn subscribe_failed(&mut self) -> Vec<ControllerAction> {
        tracing::error!(state = %self.run_state(), "subscription refused, engine stopped");
        self.subscribed = false;
        self.restart_deadline = None;
        self.state.set_run_state(RunState::Stopped);
        vec![ControllerAction::Publish(self.state.flush())]
    }

    fn resubscribe(&mut self, now: I) -> Vec<ControllerAction> {
        self.restart_deadline = None;
        self.last_activity = Some(now);
        self.state.set_run_state(RunState::Running);
        self.subscribed = true;
        vec![ControllerAction::Subscribe]
    }

    fn on_stall(&mut self, now: I) -> Vec<ControllerAction> {
        match self.run_state() {
            RunState::Running => {
                let deadline = now + self.config.restart_delay;
                let idle = self.last_activity.map(|last| now - last);
                tracing::warn!(
                    delay = ?self.config.restart_delay,
                    idle = ?idle,
                    "transport stalled, scheduling restart"
                );
                self.restart_deadline = Some(deadline);
                self.state.set_run_state(RunState::Restarting);
                self.subscribed = false;
                vec![ControllerAction::Unsubscribe]
            },
            RunState::Restarting => {
                tracing::debug!("stall ignored, restart already pending");
                Vec::new()
            },
            RunState::Stopped => Vec::new(),
        }
    }

    fn fault_turn(&mut self, turn_id: TurnId) -> Vec<ControllerAction> {
        match self.state.fault_turn(turn_id) {
            Some(status) => {
                tracing::debug!(turn_id, %status, "turn faulted");
                self.publish()
            },
            None => Vec::new(),
        }
    }

    fn publish(&mut self) -> Vec<ControllerAction> {
        self.state.publish().map(ControllerAction::Publish).into_iter().collect()
    }
}

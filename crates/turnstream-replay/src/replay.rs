//! Capture replay.
//!
//! Feeds recorded transport events through a real [`Engine`] over a
//! [`ChannelTransport`], one event per step. A recorded stall is allowed to
//! complete its restart before the next event is delivered, so a capture
//! replays to the transcript the session would have shown had the transport
//! come back immediately.

use std::io::Write;

use serde::Serialize;
use turnstream_engine::{
    ChannelTransport, ControllerStats, Engine, EngineConfig, Observer, RunState, Snapshot,
    TransportEvent,
};

use crate::ReplayError;

/// Result of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    /// Final flushed transcript
    pub snapshot: Snapshot,
    /// Controller counters
    pub stats: ControllerStats,
    /// Snapshots handed to the observer, including the final flush
    pub emissions: usize,
    /// Events the transport had no subscriber for
    pub undelivered: usize,
}

#[derive(Debug, Default)]
struct Emissions(usize);

impl Observer for Emissions {
    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.0 += 1;
        tracing::trace!(turns = snapshot.len(), emission = self.0, "snapshot");
    }
}

/// Replay `events` through a fresh engine.
///
/// # Errors
///
/// - `ReplayError::Engine` if the config is invalid or a subscription is
///   refused
pub async fn replay(
    config: EngineConfig,
    events: Vec<TransportEvent>,
) -> Result<ReplayOutcome, ReplayError> {
    let transport = ChannelTransport::new();
    let host = transport.clone();
    let mut engine = Engine::new(config, transport, Emissions::default())?;
    engine.start()?;

    let mut undelivered = 0;
    for event in events {
        if !host.deliver(event) {
            undelivered += 1;
            continue;
        }
        engine.step().await?;
        while engine.run_state() == RunState::Restarting {
            engine.step().await?;
        }
    }

    engine.stop();
    let outcome = ReplayOutcome {
        snapshot: engine.snapshot(),
        stats: engine.stats(),
        emissions: engine.observer().0,
        undelivered,
    };
    tracing::info!(
        turns = outcome.snapshot.len(),
        emissions = outcome.emissions,
        undelivered = outcome.undelivered,
        applied = outcome.stats.frames_applied,
        decode_errors = outcome.stats.decode_errors,
        restarts = outcome.stats.restarts,
        "replay finished"
    );
    Ok(outcome)
}

/// Write the transcript as one line per turn, in turn order.
///
/// ```text
/// #1 [completed] Good morning
/// #2 [in_progress] What
/// ```
///
/// # Errors
///
/// - `ReplayError::Output` if writing fails
pub fn write_text(out: &mut impl Write, outcome: &ReplayOutcome) -> Result<(), ReplayError> {
    for record in outcome.snapshot.records() {
        writeln!(out, "#{} [{}] {}", record.turn_id, record.status, record.text)?;
    }
    Ok(())
}

/// Write the outcome as a single JSON document.
///
/// # Errors
///
/// - `ReplayError::Serialize` if serialization fails
/// - `ReplayError::Output` if writing fails
pub fn write_json(out: &mut impl Write, outcome: &ReplayOutcome) -> Result<(), ReplayError> {
    serde_json::to_writer_pretty(&mut *out, outcome)?;
    writeln!(out)?;
    Ok(())
}

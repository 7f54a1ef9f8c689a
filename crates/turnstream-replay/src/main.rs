//! Turnstream replay binary.
//!
//! # Usage
//!
//! ```bash
//! # Replay a TEXT-framed capture for agent 333
//! turnstream-replay --capture session.jsonl --speaker 333
//!
//! # Legacy framing, JSON output
//! TURNSTREAM_AGENT_SPEAKER=333 turnstream-replay -c session.jsonl --mode legacy --json
//! ```

use std::{io::Write, path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use turnstream_core::config::DEFAULT_STALL_PATTERN;
use turnstream_engine::{EngineConfig, FrameMode};
use turnstream_replay::{capture, replay, write_json, write_text};

/// Turnstream capture replay
#[derive(Parser, Debug)]
#[command(name = "turnstream-replay")]
#[command(about = "Replay a captured agent session and print the transcript")]
#[command(version)]
struct Args {
    /// Capture file (JSON lines)
    #[arg(short, long)]
    capture: PathBuf,

    /// Frame format used by the agent (text, legacy)
    #[arg(short, long, default_value = "text")]
    mode: FrameMode,

    /// Speaker id of the remote agent
    #[arg(short, long, env = "TURNSTREAM_AGENT_SPEAKER")]
    speaker: String,

    /// Delay before resubscribing after a stall, in milliseconds
    #[arg(long, default_value = "50")]
    restart_delay_ms: u64,

    /// Diagnostic substring that signals a stalled transport
    #[arg(long, default_value = DEFAULT_STALL_PATTERN)]
    stall_pattern: String,

    /// Print the outcome as JSON instead of one line per turn
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = EngineConfig::new(args.mode, args.speaker.as_str())
        .with_restart_delay(Duration::from_millis(args.restart_delay_ms))
        .with_stall_pattern(args.stall_pattern);

    let events = capture::read(&args.capture)?;
    tracing::info!(
        capture = %args.capture.display(),
        events = events.len(),
        mode = %args.mode,
        "replaying"
    );

    let outcome = replay(config, events).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        write_json(&mut out, &outcome)?;
    } else {
        write_text(&mut out, &outcome)?;
    }
    out.flush()?;

    Ok(())
}

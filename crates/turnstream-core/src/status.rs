//! Turn lifecycle rules.
//!
//! ```text
//! ┌─────────┐ fragment ┌────────────┐  final   ┌───────────┐
//! │ Pending │─────────>│ InProgress │─────────>│ Completed │
//! └─────────┘          └────────────┘          └───────────┘
//!      │                      │                      │
//!      │ fault                │ fault                │ invalidated
//!      ↓                      ↓                      ↓
//!  ┌───────┐              ┌───────┐              ┌───────┐
//!  │ Error │              │ Error │              │ Error │
//!  └───────┘              └───────┘              └───────┘
//! ```
//!
//! Transitions only move forward. The single exception to "terminal is
//! final" is an explicit invalidation, which may turn `Completed` into
//! `Error`.

use turnstream_proto::{TurnFault, WireEvent};

use crate::TurnStatus;

/// Stateless status transition rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTracker;

impl StatusTracker {
    /// Status after applying `event` to a turn currently in `current`.
    ///
    /// Any applied fragment starts the turn, even one without text.
    /// `superseded` is true when a newer turn of the same speaker has already
    /// streamed; such a turn can no longer become `InProgress` and settles as
    /// `Completed` instead.
    pub fn advance(current: TurnStatus, event: &WireEvent, superseded: bool) -> TurnStatus {
        match event.fault {
            Some(TurnFault::Invalidated) => return TurnStatus::Error,
            Some(TurnFault::Interrupted) => {
                return if current.is_terminal() { current } else { TurnStatus::Error };
            },
            None => {},
        }

        if current.is_terminal() {
            return current;
        }

        if event.is_final || superseded { TurnStatus::Completed } else { TurnStatus::InProgress }
    }

    /// Status after a decoder or transport fault tied to the turn.
    ///
    /// Such faults are not invalidations, so a completed turn stays
    /// completed.
    pub fn fault(current: TurnStatus) -> TurnStatus {
        match current {
            TurnStatus::Completed => TurnStatus::Completed,
            TurnStatus::Pending | TurnStatus::InProgress | TurnStatus::Error => TurnStatus::Error,
        }
    }

    /// Status when a newer turn of the same speaker starts streaming.
    pub fn supersede(current: TurnStatus) -> TurnStatus {
        if current == TurnStatus::InProgress { TurnStatus::Completed } else { current }
    }

    /// The transition relation: true if `from → to` can ever be observed.
    pub fn is_valid_transition(from: TurnStatus, to: TurnStatus) -> bool {
        use TurnStatus::{Completed, Error, InProgress, Pending};

        from == to
            || matches!(
                (from, to),
                (Pending, InProgress | Completed | Error)
                    | (InProgress, Completed | Error)
                    | (Completed, Error)
            )
    }
}

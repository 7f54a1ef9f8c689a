//! Runtime error types.

use thiserror::Error;
use turnstream_core::ConstructionError;

/// Failures surfaced to the engine's owner.
///
/// Per-frame problems never appear here; the controller absorbs them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// Transport refused a subscription; the engine is stopped
    #[error("subscription refused: {0}")]
    SubscriptionRefused(String),

    /// Engine task panicked or was cancelled
    #[error("engine task failed: {0}")]
    TaskFailed(String),
}

/// Errors from [`crate::ChannelTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Transport was closed by the host
    #[error("transport closed")]
    Closed,

    /// Another subscription is still active
    #[error("transport already has an active subscription")]
    AlreadySubscribed,
}

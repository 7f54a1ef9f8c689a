//! Transport trait for abstracting the host messaging SDK.
//!
//! The [`Transport`] trait decouples the engine from a specific messaging
//! client. Each host implements it to deliver stream messages and
//! out-of-band signals, while the generic [`crate::Engine`] handles all
//! orchestration.

use std::future::Future;

use bytes::Bytes;
use turnstream_core::{SpeakerId, TransportSignal};

/// Something the transport delivers to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw stream message from a participant
    Frame {
        /// Sender of the message
        speaker_id: SpeakerId,
        /// Undecoded payload
        payload: Bytes,
    },
    /// Out-of-band notification
    Signal(TransportSignal),
}

/// Source of stream-message subscriptions.
///
/// # Implementations
///
/// - **In-process**: [`crate::ChannelTransport`], fed from SDK callbacks
/// - **Tests**: flaky transports that refuse or drop on demand
pub trait Transport: Send {
    /// Host-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Active subscription. Dropping it unsubscribes.
    type Subscription: Subscription;

    /// Subscribe to the per-frame event.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses the subscription.
    fn subscribe(&mut self) -> Result<Self::Subscription, Self::Error>;
}

/// An open subscription.
///
/// Holding the value keeps the subscription alive; dropping it releases it.
pub trait Subscription: Send {
    /// Wait for the next event.
    ///
    /// Returns `None` once the transport is closed. Must be cancel safe: the
    /// engine polls it inside `tokio::select!`.
    fn next_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;
}

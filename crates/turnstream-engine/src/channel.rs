//! In-process transport fed by host callbacks.
//!
//! Messaging SDKs deliver stream messages through callbacks on their own
//! threads. [`ChannelTransport`] turns those callbacks into an event stream
//! for the engine: the host calls [`ChannelTransport::deliver_frame`] and the
//! engine's [`ChannelSubscription`] receives it.
//!
//! Only one subscription can be active at a time. While none is active
//! (stopped, or the gap of a stall restart) deliveries are dropped and
//! `deliver` reports `false`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use turnstream_core::{SpeakerId, TransportSignal};

use crate::{Subscription, Transport, TransportError, TransportEvent};

#[derive(Debug, Default)]
struct Shared {
    /// Sender of the active subscription, tagged with its id
    active: Option<(u64, mpsc::UnboundedSender<TransportEvent>)>,
    next_id: u64,
    subscriptions: u64,
    closed: bool,
}

/// Callback-fed transport.
///
/// Cloning yields another handle to the same transport, so the host keeps
/// one clone for its callbacks while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ChannelTransport {
    shared: Arc<Mutex<Shared>>,
}

impl ChannelTransport {
    /// Open transport with no subscription.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an event to the active subscription.
    ///
    /// Returns `false` if there is none and the event was dropped.
    pub fn deliver(&self, event: TransportEvent) -> bool {
        let shared = self.lock();
        match &shared.active {
            Some((_, sender)) => sender.send(event).is_ok(),
            None => {
                tracing::trace!("no active subscription, event dropped");
                false
            },
        }
    }

    /// Deliver a stream message.
    pub fn deliver_frame(
        &self,
        speaker_id: impl Into<SpeakerId>,
        payload: impl Into<Bytes>,
    ) -> bool {
        self.deliver(TransportEvent::Frame {
            speaker_id: speaker_id.into(),
            payload: payload.into(),
        })
    }

    /// Deliver an out-of-band signal.
    pub fn signal(&self, signal: TransportSignal) -> bool {
        self.deliver(TransportEvent::Signal(signal))
    }

    /// True while a subscription is active.
    pub fn is_subscribed(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Number of subscriptions granted so far.
    pub fn subscribe_count(&self) -> u64 {
        self.lock().subscriptions
    }

    /// Close the transport.
    ///
    /// The active subscription sees the end of its stream after draining
    /// queued events; further subscriptions are refused.
    pub fn close(&self) {
        let mut shared = self.lock();
        shared.closed = true;
        shared.active = None;
    }
}

impl Transport for ChannelTransport {
    type Error = TransportError;
    type Subscription = ChannelSubscription;

    fn subscribe(&mut self) -> Result<ChannelSubscription, TransportError> {
        let mut shared = self.lock();
        if shared.closed {
            return Err(TransportError::Closed);
        }
        if shared.active.is_some() {
            return Err(TransportError::AlreadySubscribed);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = shared.next_id;
        shared.next_id += 1;
        shared.subscriptions += 1;
        shared.active = Some((id, sender));

        Ok(ChannelSubscription { id, receiver, shared: Arc::clone(&self.shared) })
    }
}

/// Active subscription on a [`ChannelTransport`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChannelSubscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<TransportEvent>,
    shared: Arc<Mutex<Shared>>,
}

impl Subscription for ChannelSubscription {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.receiver.recv().await
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.active.as_ref().is_some_and(|(id, _)| *id == self.id) {
            shared.active = None;
        }
    }
}

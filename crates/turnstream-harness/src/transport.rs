//! Fault-injecting transports and delivery schedules.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use turnstream_core::WireEvent;
use turnstream_engine::{ChannelSubscription, ChannelTransport, Transport, TransportError};

/// Errors from [`FlakyTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlakyError {
    /// Subscription refused by fault injection
    #[error("subscription {attempt} refused")]
    Refused {
        /// 1-based subscription attempt that was refused
        attempt: u64,
    },

    /// Error from the wrapped transport
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Channel transport that can refuse subscriptions.
///
/// Deliveries go through [`FlakyTransport::host`]; the engine owns the
/// transport itself.
#[derive(Debug, Clone)]
pub struct FlakyTransport {
    inner: ChannelTransport,
    grant_limit: Option<u64>,
    attempts: u64,
}

impl FlakyTransport {
    /// Transport that grants every subscription.
    pub fn new() -> Self {
        Self { inner: ChannelTransport::new(), grant_limit: None, attempts: 0 }
    }

    /// Grant the first `grants` subscriptions, refuse every later one.
    #[must_use]
    pub fn refusing_after(mut self, grants: u64) -> Self {
        self.grant_limit = Some(grants);
        self
    }

    /// Host-side handle for delivering frames and signals.
    pub fn host(&self) -> ChannelTransport {
        self.inner.clone()
    }

    /// Subscription attempts so far, granted or refused.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}

impl Default for FlakyTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for FlakyTransport {
    type Error = FlakyError;
    type Subscription = ChannelSubscription;

    fn subscribe(&mut self) -> Result<ChannelSubscription, FlakyError> {
        self.attempts += 1;
        if let Some(limit) = self.grant_limit
            && self.attempts > limit
        {
            tracing::debug!(attempt = self.attempts, "injecting subscription refusal");
            return Err(FlakyError::Refused { attempt: self.attempts });
        }
        Ok(self.inner.subscribe()?)
    }
}

/// Seeded delivery schedule with duplicates and local reordering.
///
/// The same seed always yields the same schedule.
#[derive(Debug, Clone)]
pub struct ChaosFeed {
    rng: ChaCha8Rng,
    duplicate_rate: f64,
    swap_rate: f64,
}

impl ChaosFeed {
    /// Feed with the given seed and no faults.
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), duplicate_rate: 0.0, swap_rate: 0.0 }
    }

    /// Probability that an event is delivered twice.
    #[must_use]
    pub fn with_duplicates(mut self, rate: f64) -> Self {
        self.duplicate_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Probability that an event swaps places with its successor.
    #[must_use]
    pub fn with_swaps(mut self, rate: f64) -> Self {
        self.swap_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Delivery order for `events`.
    pub fn schedule(&mut self, events: &[WireEvent]) -> Vec<WireEvent> {
        let mut out: Vec<WireEvent> = Vec::with_capacity(events.len() * 2);
        for event in events {
            out.push(event.clone());
            if self.rng.gen_bool(self.duplicate_rate) {
                out.push(event.clone());
            }
        }

        let mut i = 0;
        while i + 1 < out.len() {
            if self.rng.gen_bool(self.swap_rate) {
                out.swap(i, i + 1);
                i += 2;
            } else {
                i += 1;
            }
        }
        out
    }
}

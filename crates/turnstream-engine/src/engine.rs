//! Single-task engine event loop.

use std::future::Future;

use tokio::time::Instant;
use turnstream_core::{
    Controller, ControllerAction, ControllerStats, EngineConfig, RunState, Snapshot,
};

use crate::{EngineError, EngineHandle, Observer, Subscription, Transport, TransportEvent};

/// What one [`Engine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Handled one transport event
    Event,
    /// Restart timer fired
    Tick,
    /// Transport closed; the engine stopped
    Closed,
    /// Engine is stopped; nothing to wait for
    Idle,
}

/// Transcript engine
///
/// Owns the controller, the transport, the current subscription and the
/// observer. Processes one event to completion before the next, so no
/// locking is needed anywhere in the pipeline.
///
/// # Type Parameters
///
/// - `T`: host transport
/// - `O`: snapshot observer
pub struct Engine<T, O>
where
    T: Transport,
    O: Observer,
{
    controller: Controller<Instant>,
    transport: T,
    subscription: Option<T::Subscription>,
    observer: O,
}

impl<T, O> Engine<T, O>
where
    T: Transport,
    O: Observer,
{
    /// Create a stopped engine.
    ///
    /// # Errors
    ///
    /// - `EngineError::Construction` if the configuration does not validate
    pub fn new(config: EngineConfig, transport: T, observer: O) -> Result<Self, EngineError> {
        let controller = Controller::new(config)?;
        Ok(Self { controller, transport, subscription: None, observer })
    }

    /// Subscribe and start applying frames. No-op while running.
    ///
    /// # Errors
    ///
    /// - `EngineError::SubscriptionRefused` if the transport refuses; the
    ///   engine stays stopped
    pub fn start(&mut self) -> Result<(), EngineError> {
        let actions = self.controller.start(Instant::now());
        self.execute(actions)
    }

    /// Unsubscribe, cancel any pending restart and flush a final snapshot.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        let actions = self.controller.stop();
        if let Err(error) = self.execute(actions) {
            tracing::warn!(%error, "error while stopping engine");
        }
    }

    /// Current lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.controller.run_state()
    }

    /// True while a transport subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Controller counters.
    pub fn stats(&self) -> ControllerStats {
        self.controller.stats()
    }

    /// Current transcript.
    pub fn snapshot(&self) -> Snapshot {
        self.controller.snapshot()
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registered observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Wait for and process exactly one transport event or timer expiry.
    ///
    /// Cancel safe: nothing is consumed until the awaited event is ready.
    ///
    /// # Errors
    ///
    /// - `EngineError::SubscriptionRefused` if a resubscription after a
    ///   stall was refused; the engine is stopped
    pub async fn step(&mut self) -> Result<Step, EngineError> {
        if self.controller.run_state() == RunState::Stopped {
            return Ok(Step::Idle);
        }

        let deadline = self.controller.restart_deadline();
        tokio::select! {
            event = next_event(self.subscription.as_mut()) => match event {
                Some(event) => {
                    self.handle_event(event)?;
                    Ok(Step::Event)
                },
                None => {
                    tracing::info!("transport closed, stopping engine");
                    self.stop();
                    Ok(Step::Closed)
                },
            },
            () = restart_timer(deadline) => {
                let actions = self.controller.tick(Instant::now());
                self.execute(actions)?;
                Ok(Step::Tick)
            },
        }
    }

    /// Run until `shutdown` resolves, the transport closes, or the engine
    /// stops on its own. Always stops the engine before returning.
    ///
    /// # Errors
    ///
    /// - `EngineError::SubscriptionRefused` if a resubscription was refused
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), EngineError>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),
                step = self.step() => match step {
                    Ok(Step::Event | Step::Tick) => {},
                    Ok(Step::Closed | Step::Idle) => break Ok(()),
                    Err(error) => break Err(error),
                },
            }
        };

        self.stop();
        result
    }

    /// Run a started engine on its own tokio task.
    pub fn spawn(self) -> EngineHandle
    where
        T: 'static,
        T::Subscription: 'static,
        O: 'static,
    {
        EngineHandle::spawn(self)
    }

    fn handle_event(&mut self, event: TransportEvent) -> Result<(), EngineError> {
        let now = Instant::now();
        let actions = match event {
            TransportEvent::Frame { speaker_id, payload } => {
                self.controller.handle_frame(&speaker_id, &payload, now)
            },
            TransportEvent::Signal(signal) => self.controller.handle_signal(signal, now),
        };
        self.execute(actions)
    }

    /// Execute controller actions in order.
    ///
    /// A refused subscription feeds `subscribe_failed` back into the
    /// controller and its actions are executed too.
    fn execute(&mut self, initial_actions: Vec<ControllerAction>) -> Result<(), EngineError> {
        let mut pending_actions = initial_actions;
        let mut result = Ok(());

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    ControllerAction::Subscribe => match self.transport.subscribe() {
                        Ok(subscription) => self.subscription = Some(subscription),
                        Err(error) => {
                            tracing::error!(%error, "transport refused subscription");
                            self.subscription = None;
                            pending_actions.extend(self.controller.subscribe_failed());
                            result = Err(EngineError::SubscriptionRefused(error.to_string()));
                        },
                    },
                    ControllerAction::Unsubscribe => {
                        self.subscription = None;
                    },
                    ControllerAction::Publish(snapshot) => self.observer.on_snapshot(&snapshot),
                }
            }
        }
        result
    }
}

impl<T, O> Drop for Engine<T, O>
where
    T: Transport,
    O: Observer,
{
    fn drop(&mut self) {
        if self.controller.run_state() != RunState::Stopped {
            self.stop();
        }
    }
}

async fn next_event<S: Subscription>(subscription: Option<&mut S>) -> Option<TransportEvent> {
    match subscription {
        Some(subscription) => subscription.next_event().await,
        None => std::future::pending().await,
    }
}

async fn restart_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

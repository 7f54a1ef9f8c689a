//! Engine ownership.
//!
//! A session owns at most one engine. [`EngineSlot`] enforces that by
//! tearing down the attached engine before a replacement subscribes, so a
//! stale engine can never emit after its successor started.

use tokio::{sync::oneshot, task::JoinHandle};
use turnstream_core::{ControllerStats, EngineConfig, Snapshot};

use crate::{Engine, EngineError, Observer, Transport};

/// Final state of a stopped engine.
#[derive(Debug)]
pub struct EngineReport {
    /// Counters at shutdown
    pub stats: ControllerStats,
    /// Transcript at shutdown (same as the final flushed snapshot)
    pub snapshot: Snapshot,
    /// Why the engine stopped on its own, if it did
    pub error: Option<EngineError>,
}

/// Handle to an engine running on its own task.
///
/// Dropping the handle stops the engine; [`EngineHandle::stop`] also waits
/// for the final flush and returns the report.
#[derive(Debug)]
pub struct EngineHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<EngineReport>>,
}

impl EngineHandle {
    pub(crate) fn spawn<T, O>(mut engine: Engine<T, O>) -> Self
    where
        T: Transport + 'static,
        T::Subscription: 'static,
        O: Observer + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let shutdown = async {
                // Sender dropped counts as a shutdown request too.
                let _ = shutdown_rx.await;
            };
            let result = engine.run_until(shutdown).await;
            if let Err(error) = &result {
                tracing::warn!(%error, "engine stopped on its own");
            }
            EngineReport { stats: engine.stats(), snapshot: engine.snapshot(), error: result.err() }
        });

        Self { shutdown: Some(shutdown_tx), task: Some(task) }
    }

    /// True once the engine task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the engine and wait for its final flush.
    ///
    /// # Errors
    ///
    /// - `EngineError::TaskFailed` if the engine task panicked or was
    ///   cancelled
    pub async fn stop(mut self) -> Result<EngineReport, EngineError> {
        self.request_shutdown();
        let Some(task) = self.task.take() else {
            return Err(EngineError::TaskFailed("engine already joined".to_string()));
        };
        task.await.map_err(|e| EngineError::TaskFailed(e.to_string()))
    }

    fn request_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.request_shutdown();
    }
}

/// Holds the single engine of a session.
#[derive(Debug, Default)]
pub struct EngineSlot {
    current: Option<EngineHandle>,
}

impl EngineSlot {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the attached engine.
    ///
    /// Stops the previous engine and waits for its final flush before the
    /// new engine is constructed and subscribes. Returns the previous
    /// engine's report.
    ///
    /// # Errors
    ///
    /// - `EngineError::Construction` if `config` is invalid
    /// - `EngineError::SubscriptionRefused` if the transport refuses the
    ///   initial subscription
    ///
    /// On error the slot is left empty.
    pub async fn attach<T, O>(
        &mut self,
        config: EngineConfig,
        transport: T,
        observer: O,
    ) -> Result<Option<EngineReport>, EngineError>
    where
        T: Transport + 'static,
        T::Subscription: 'static,
        O: Observer + 'static,
    {
        let previous = self.detach().await?;

        let mut engine = Engine::new(config, transport, observer)?;
        engine.start()?;
        self.current = Some(engine.spawn());
        tracing::debug!(replaced = previous.is_some(), "engine attached");

        Ok(previous)
    }

    /// Stop and remove the attached engine, if any.
    ///
    /// # Errors
    ///
    /// - `EngineError::TaskFailed` if the engine task panicked
    pub async fn detach(&mut self) -> Result<Option<EngineReport>, EngineError> {
        match self.current.take() {
            Some(handle) => handle.stop().await.map(Some),
            None => Ok(None),
        }
    }

    /// True if an engine is attached and still running.
    pub fn is_attached(&self) -> bool {
        self.current.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

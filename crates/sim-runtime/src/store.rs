//! Committed-state container and notification sink.
//!
//! `GameStore` enforces the single-writer, copy-on-write discipline: every
//! mutator proposes a new snapshot from the committed one, and the store
//! swaps the committed `Arc` atomically. Readers holding an older `Arc`
//! keep a fully consistent snapshot; there are no torn reads.

use chrono::Utc;
use persistence::SaveStore;
use sim_core::actions::Applied;
use sim_core::model::{GameState, Severity};
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Consumer of orchestration events. Purely observational; nothing feeds
/// back into the simulation.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Sink that forwards notifications to the tracing subscriber.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "notifications", "{message}"),
            Severity::Success => tracing::info!(target: "notifications", "{message}"),
            Severity::Error => tracing::warn!(target: "notifications", "{message}"),
        }
    }
}

/// Sink that records events in memory, for tests and headless drivers.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, severity: Severity, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, message.to_string()));
    }
}

pub struct GameStore {
    state: Mutex<Arc<GameState>>,
    save: Arc<dyn SaveStore>,
    sink: Arc<dyn NotificationSink>,
}

impl GameStore {
    pub fn new(
        initial: GameState,
        save: Arc<dyn SaveStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            state: Mutex::new(Arc::new(initial)),
            save,
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<GameState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The committed snapshot. Cheap; clones only the `Arc`.
    pub fn snapshot(&self) -> Arc<GameState> {
        self.lock().clone()
    }

    pub fn sink(&self) -> &dyn NotificationSink {
        self.sink.as_ref()
    }

    /// Run a player action against the committed snapshot. On success the
    /// new snapshot is committed, persisted, and announced; on failure the
    /// committed snapshot is untouched and the error is announced.
    pub fn apply<E: Display>(
        &self,
        f: impl FnOnce(&GameState) -> Result<Applied, E>,
    ) -> Result<String, E> {
        let mut guard = self.lock();
        match f(&guard) {
            Ok(Applied { state, message }) => {
                let committed = Arc::new(state);
                *guard = committed.clone();
                drop(guard);
                self.persist(&committed);
                self.sink.notify(Severity::Success, &message);
                Ok(message)
            }
            Err(err) => {
                drop(guard);
                self.sink.notify(Severity::Error, &err.to_string());
                Err(err)
            }
        }
    }

    /// Run a timer step. The closure may decline (`None`) to leave the
    /// committed snapshot untouched; otherwise the result is committed and
    /// its events announced. Returns whether a commit happened.
    pub fn advance(
        &self,
        f: impl FnOnce(&GameState) -> Option<(GameState, Vec<(Severity, String)>)>,
    ) -> bool {
        let mut guard = self.lock();
        let Some((state, events)) = f(&guard) else {
            return false;
        };
        let committed = Arc::new(state);
        *guard = committed.clone();
        drop(guard);
        self.persist(&committed);
        for (severity, message) in events {
            self.sink.notify(severity, &message);
        }
        true
    }

    /// Persist the committed snapshot. Returns whether the write landed.
    pub fn save_now(&self) -> bool {
        let snapshot = self.snapshot();
        self.persist(&snapshot)
    }

    fn persist(&self, state: &GameState) -> bool {
        match persistence::save(self.save.as_ref(), state, Utc::now()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "failed to persist snapshot");
                false
            }
        }
    }
}

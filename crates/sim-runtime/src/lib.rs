#![deny(warnings)]

//! Time-driven orchestration for Galaxy Trader.
//!
//! One [`Engine`] owns the committed snapshot and drives four periodic
//! timers on a tokio runtime: market drift, the travel-arrival poll, the
//! AutoBot tick, and the autosave notice. Timer callbacks run to
//! completion against one committed snapshot each; the store serializes
//! commits, so interleaving timers never observe a torn state.

pub mod commands;
pub mod store;

use chrono::Utc;
use persistence::SaveStore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::model::{GameState, PlanetId, Severity};
use sim_econ::{drift, MarketSource, PlanetAdminError};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

pub use store::{GameStore, MemorySink, NotificationSink, TracingSink};

/// Timer periods and the seed for runtime randomness. Correctness does
/// not depend on the exact periods; shorter polls only tighten latency.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    pub drift_interval: Duration,
    pub travel_poll_interval: Duration,
    pub autobot_tick_interval: Duration,
    pub autosave_interval: Duration,
    pub rng_seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            drift_interval: Duration::from_secs(10),
            travel_poll_interval: Duration::from_secs(1),
            autobot_tick_interval: Duration::from_secs(2),
            autosave_interval: Duration::from_secs(60),
            rng_seed: 42,
        }
    }
}

pub struct Engine {
    store: Arc<GameStore>,
    source: Arc<dyn MarketSource>,
    config: RuntimeConfig,
    rng: Mutex<ChaCha8Rng>,
    /// Planet ids with an admin change awaiting the market service.
    admin_in_flight: Mutex<BTreeSet<PlanetId>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        initial: GameState,
        config: RuntimeConfig,
        save: Arc<dyn SaveStore>,
        sink: Arc<dyn NotificationSink>,
        source: Arc<dyn MarketSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(GameStore::new(initial, save, sink)),
            source,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(config.rng_seed)),
            config,
            admin_in_flight: Mutex::new(BTreeSet::new()),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn snapshot(&self) -> Arc<GameState> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn source(&self) -> &dyn MarketSource {
        self.source.as_ref()
    }

    pub(crate) fn rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject a second concurrent admin change to the same planet id.
    pub(crate) fn begin_admin(&self, id: PlanetId) -> Result<(), PlanetAdminError> {
        let mut in_flight = self
            .admin_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(id.clone()) {
            let err = PlanetAdminError::PlanetBusy(id);
            self.store.sink().notify(Severity::Error, &err.to_string());
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn end_admin(&self, id: &PlanetId) {
        self.admin_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Spawn the periodic timers. Requires a tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            return;
        }
        tasks.push(spawn_drift(self.store.clone(), self.config));
        tasks.push(spawn_travel_watcher(self.store.clone(), self.config));
        tasks.push(spawn_autobot(self.store.clone(), self.config));
        tasks.push(spawn_autosave(self.store.clone(), self.config));
        tracing::info!("engine timers started");
    }

    /// Stop every timer. Travel still resolves by elapsed wall-clock time
    /// on the next run.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        tracing::info!("engine timers stopped");
    }
}

fn spawn_drift(store: Arc<GameStore>, config: RuntimeConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed.wrapping_add(1));
        let mut ticker = interval_at(
            Instant::now() + config.drift_interval,
            config.drift_interval,
        );
        loop {
            ticker.tick().await;
            let now = Utc::now();
            store.advance(|s| Some((drift::drift_market_prices(s, now, &mut rng), Vec::new())));
            tracing::debug!("market prices drifted");
        }
    })
}

fn spawn_travel_watcher(store: Arc<GameStore>, config: RuntimeConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed.wrapping_add(2));
        let mut ticker = interval_at(
            Instant::now() + config.travel_poll_interval,
            config.travel_poll_interval,
        );
        loop {
            ticker.tick().await;
            let now = Utc::now();
            store.advance(|s| {
                sim_core::travel::complete_travel(s, now, &mut rng)
                    .map(|applied| (applied.state, vec![(Severity::Success, applied.message)]))
            });
        }
    })
}

fn spawn_autobot(store: Arc<GameStore>, config: RuntimeConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(
            Instant::now() + config.autobot_tick_interval,
            config.autobot_tick_interval,
        );
        loop {
            ticker.tick().await;
            let now = Utc::now();
            store.advance(|s| sim_ai::tick(s, now).map(|out| (out.state, out.events)));
        }
    })
}

fn spawn_autosave(store: Arc<GameStore>, config: RuntimeConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(
            Instant::now() + config.autosave_interval,
            config.autosave_interval,
        );
        loop {
            ticker.tick().await;
            if store.save_now() {
                store.sink().notify(Severity::Info, "Game auto-saved.");
            }
        }
    })
}

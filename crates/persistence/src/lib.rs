#![deny(warnings)]

//! Persistence gateway: load/save of the whole game snapshot through a
//! key-value blob store, with integrity verification on the way in.
//!
//! The gateway owns the recovery policy: a missing, unreadable, tampered,
//! or invalid snapshot is discarded and replaced with a fresh starter
//! world. `load` therefore never returns a state that fails verification.

use chrono::{DateTime, Utc};
use rand::Rng;
use sim_core::model::{validate_state, GameState, PlanetId};
use sim_core::{catalog, checksum};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("save store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Key-value blob storage for exactly one save slot.
pub trait SaveStore: Send + Sync {
    /// Returns the stored blob, or `None` when no save exists yet.
    fn read(&self) -> Result<Option<String>, PersistError>;
    fn write(&self, blob: &str) -> Result<(), PersistError>;
}

/// One JSON blob on disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveStore for FileStore {
    fn read(&self) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, blob: &str) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, blob)?;
        Ok(())
    }
}

/// In-memory store, the test and demo stand-in for browser local storage.
#[derive(Default)]
pub struct MemoryStore {
    blob: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, PersistError> {
        let guard = self
            .blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn write(&self, blob: &str) -> Result<(), PersistError> {
        let mut guard = self
            .blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(blob.to_string());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct LoadedGame {
    pub state: GameState,
    pub is_new_game: bool,
}

/// Forward-compatibility shim for saves that predate the travel state
/// machine: a docked player without a recorded location is put back on
/// the designated start planet.
fn migrate(state: &mut GameState) {
    if !state.player.is_traveling {
        state.player.travel_info = None;
        if state.player.current_planet_id.is_none() {
            let start = PlanetId::new(catalog::START_PLANET);
            let fallback = state
                .galaxy
                .planet(&start)
                .map(|p| p.id.clone())
                .or_else(|| state.galaxy.planets.first().map(|p| p.id.clone()));
            state.player.current_planet_id = fallback;
            tracing::info!("legacy save migrated onto the start planet");
        }
    }
}

fn fresh_world(
    store: &dyn SaveStore,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<LoadedGame, PersistError> {
    let state = catalog::new_game_state(now, rng);
    save(store, &state, now)?;
    Ok(LoadedGame {
        state,
        is_new_game: true,
    })
}

/// Load the save slot, rebuilding a fresh world on any corruption.
pub fn load(
    store: &dyn SaveStore,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<LoadedGame, PersistError> {
    let Some(blob) = store.read()? else {
        tracing::info!("no saved game found, creating a new one");
        return fresh_world(store, now, rng);
    };

    let mut state = match serde_json::from_str::<GameState>(&blob) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(%err, "save blob unreadable, starting a new game");
            return fresh_world(store, now, rng);
        }
    };

    if !checksum::verify(&state) {
        tracing::warn!("save checksum mismatch, data may be corrupted; starting a new game");
        return fresh_world(store, now, rng);
    }

    migrate(&mut state);

    if let Err(err) = validate_state(&state) {
        tracing::warn!(%err, "saved state violates invariants, starting a new game");
        return fresh_world(store, now, rng);
    }

    tracing::info!("game loaded");
    Ok(LoadedGame {
        state,
        is_new_game: false,
    })
}

/// Persist a snapshot: stamp `last_updated`, recompute the digest, and
/// strip any AutoBot mission — missions never survive a reload.
pub fn save(store: &dyn SaveStore, state: &GameState, now: DateTime<Utc>) -> Result<(), PersistError> {
    let mut snapshot = state.clone();
    snapshot.auto_bot = None;
    snapshot.last_updated = now;
    snapshot.checksum = checksum::digest(&snapshot);
    store.write(&serde_json::to_string(&snapshot)?)
}

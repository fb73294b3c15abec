#![deny(warnings)]

//! Core domain models and state mutators for Galaxy Trader.
//!
//! This crate defines the serializable game snapshot, validation helpers
//! that guarantee its invariants, and the pure copy-on-write mutators for
//! every player-initiated action: trading, repair, upgrades, and travel.
//! Orchestration (timers, commits, persistence) lives in sibling crates.

pub mod actions;
pub mod catalog;
pub mod checksum;
pub mod model;
pub mod placement;
pub mod travel;

pub use actions::{ActionError, ActionResult, Applied, HullStatus, UpgradeTrack};
pub use model::{
    AutoBotState, AutoBotTask, CargoHold, CargoItem, Galaxy, GameState, Good, GoodId, MarketEntry,
    Planet, PlanetId, PlayerState, Position, Severity, Ship, TravelInfo, UpgradeLevels,
    ValidationError,
};

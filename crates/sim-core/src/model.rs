//! Serializable domain types for the Galaxy Trader simulation with
//! validation helpers to guarantee basic invariants.
//!
//! `GameState` is the single root of mutation. Every mutator in this
//! workspace takes one snapshot and returns a new one; the input snapshot
//! is never modified in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a tradeable good, e.g. "water", "tech".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoodId(pub String);

impl GoodId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for GoodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a planet, e.g. "terra".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanetId(pub String);

impl PlanetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable catalog entry for a tradeable good.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Good {
    pub id: GoodId,
    /// Display name, e.g. "Xenon Crystals".
    pub name: String,
    /// Positive reference price in credits.
    pub base_price: u32,
}

/// Per-(planet, good) price pair. Both prices are positive integers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub good_id: GoodId,
    pub buy_price: u32,
    pub sell_price: u32,
}

/// A point in galactic map space. x/y drive 2-D separation on the map,
/// the full 3-D distance drives fuel cost and travel duration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Full euclidean distance.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance ignoring the z axis, used for map placement.
    pub fn distance_2d(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub name: String,
    pub position: Position,
    /// Fraction in [0, 1) levied on credits at arrival.
    pub tax_rate: f32,
    pub description: String,
    /// Map display color, "#rrggbb".
    pub color: String,
    /// One entry expected per catalog good.
    pub market: Vec<MarketEntry>,
}

impl Planet {
    pub fn market_entry(&self, good_id: &GoodId) -> Option<&MarketEntry> {
        self.market.iter().find(|e| &e.good_id == good_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Galaxy {
    pub name: String,
    pub planets: Vec<Planet>,
    pub goods: Vec<Good>,
}

impl Galaxy {
    pub fn planet(&self, id: &PlanetId) -> Option<&Planet> {
        self.planets.iter().find(|p| &p.id == id)
    }

    pub fn good(&self, id: &GoodId) -> Option<&Good> {
        self.goods.iter().find(|g| &g.id == id)
    }

    /// Display name for a good, falling back to its raw id.
    pub fn good_name(&self, id: &GoodId) -> String {
        self.good(id)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| id.0.clone())
    }
}

/// A held cargo line. Zero-quantity lines are pruned, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CargoItem {
    pub good_id: GoodId,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CargoHold {
    pub capacity: u32,
    pub items: Vec<CargoItem>,
}

impl CargoHold {
    /// Total units currently held across all lines.
    pub fn load(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.load())
    }

    pub fn quantity_of(&self, good_id: &GoodId) -> u32 {
        self.items
            .iter()
            .find(|i| &i.good_id == good_id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    /// Add units to a line, creating it if absent. Adding zero is a no-op.
    pub fn add(&mut self, good_id: &GoodId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| &i.good_id == good_id) {
            item.quantity += quantity;
        } else {
            self.items.push(CargoItem {
                good_id: good_id.clone(),
                quantity,
            });
        }
    }

    /// Remove up to `quantity` units, pruning the line when it hits zero.
    /// Returns the number of units actually removed.
    pub fn remove(&mut self, good_id: &GoodId, quantity: u32) -> u32 {
        let Some(pos) = self.items.iter().position(|i| &i.good_id == good_id) else {
            return 0;
        };
        let taken = self.items[pos].quantity.min(quantity);
        self.items[pos].quantity -= taken;
        if self.items[pos].quantity == 0 {
            self.items.remove(pos);
        }
        taken
    }
}

/// Upgrade levels per track. Levels start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeLevels {
    pub cargo: u8,
    pub durability: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub name: String,
    /// Current hull integrity, 0..=max_durability.
    pub durability: u32,
    pub max_durability: u32,
    pub cargo: CargoHold,
    pub upgrades: UpgradeLevels,
}

/// Present only while a journey is underway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelInfo {
    pub origin: PlanetId,
    pub destination: PlanetId,
    pub departed_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub credits: u64,
    /// None while in transit. Older saves may omit the field entirely;
    /// the persistence gateway backfills the designated start planet.
    #[serde(default)]
    pub current_planet_id: Option<PlanetId>,
    pub ship: Ship,
    #[serde(default)]
    pub is_traveling: bool,
    #[serde(default)]
    pub travel_info: Option<TravelInfo>,
}

impl PlayerState {
    /// Docked means a current planet is set and no journey is underway.
    pub fn is_docked(&self) -> bool {
        self.current_planet_id.is_some() && !self.is_traveling
    }
}

/// Task cycle of the unattended trading agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoBotTask {
    Buying,
    TravelingToSell,
    Selling,
    TravelingToBuy,
}

/// Most recent log lines kept in an AutoBot mission.
pub const AUTOBOT_LOG_CAP: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoBotState {
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    /// Mission deadline; the first tick at or past it deactivates the bot.
    pub deadline: DateTime<Utc>,
    pub origin: PlanetId,
    pub destination: PlanetId,
    pub good_id: GoodId,
    /// Units targeted per buy leg.
    pub trade_quantity: u32,
    pub current_task: AutoBotTask,
    pub logs: VecDeque<String>,
}

impl AutoBotState {
    /// Append a timestamped line, evicting the oldest past the cap.
    pub fn push_log(&mut self, now: DateTime<Utc>, message: impl AsRef<str>) {
        self.logs
            .push_back(format!("[{}] {}", now.format("%H:%M:%S"), message.as_ref()));
        while self.logs.len() > AUTOBOT_LOG_CAP {
            self.logs.pop_front();
        }
    }
}

/// Notification severity reported alongside orchestration events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Top-level game snapshot: player, galaxy, and bookkeeping fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub player: PlayerState,
    pub galaxy: Galaxy,
    pub last_updated: DateTime<Utc>,
    /// Tamper-detection digest, maintained by the persistence gateway.
    pub checksum: String,
    #[serde(default)]
    pub auto_bot: Option<AutoBotState>,
}

impl GameState {
    /// The planet the player is docked at, if any.
    pub fn current_planet(&self) -> Option<&Planet> {
        let id = self.player.current_planet_id.as_ref()?;
        self.galaxy.planet(id)
    }

    /// Whether an AutoBot mission is currently running.
    pub fn autobot_active(&self) -> bool {
        self.auto_bot.as_ref().map(|b| b.is_active).unwrap_or(false)
    }
}

/// Validation errors for domain invariants.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("price must be a positive integer")]
    NonPositivePrice,
    #[error("tax rate {0} is outside [0, 1)")]
    TaxRateOutOfRange(f32),
    #[error("duplicate planet id: {0}")]
    DuplicatePlanetId(String),
    #[error("duplicate good id: {0}")]
    DuplicateGoodId(String),
    #[error("market references unknown good: {0}")]
    UnknownGood(String),
    #[error("unknown planet referenced: {0}")]
    UnknownPlanet(String),
    #[error("cargo load {load} exceeds capacity {capacity}")]
    CargoOverCapacity { load: u32, capacity: u32 },
    #[error("cargo line for {0} has zero quantity")]
    ZeroQuantityCargo(String),
    #[error("durability exceeds the hull maximum")]
    DurabilityAboveMax,
    #[error("player must be either docked or in transit, not both or neither")]
    TravelStateConflict,
}

/// Validate a catalog good.
pub fn validate_good(good: &Good) -> Result<(), ValidationError> {
    if good.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if good.base_price == 0 {
        return Err(ValidationError::NonPositivePrice);
    }
    Ok(())
}

/// Validate a planet, including its market against the goods catalog.
pub fn validate_planet(planet: &Planet, goods: &[Good]) -> Result<(), ValidationError> {
    if planet.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if !(0.0..1.0).contains(&planet.tax_rate) || !planet.tax_rate.is_finite() {
        return Err(ValidationError::TaxRateOutOfRange(planet.tax_rate));
    }
    for entry in &planet.market {
        if goods.iter().all(|g| g.id != entry.good_id) {
            return Err(ValidationError::UnknownGood(entry.good_id.0.clone()));
        }
        if entry.buy_price == 0 || entry.sell_price == 0 {
            return Err(ValidationError::NonPositivePrice);
        }
    }
    Ok(())
}

/// Validate the galaxy: goods, planets, and id uniqueness.
pub fn validate_galaxy(galaxy: &Galaxy) -> Result<(), ValidationError> {
    let mut good_ids: BTreeSet<&GoodId> = BTreeSet::new();
    for good in &galaxy.goods {
        validate_good(good)?;
        if !good_ids.insert(&good.id) {
            return Err(ValidationError::DuplicateGoodId(good.id.0.clone()));
        }
    }
    let mut planet_ids: BTreeSet<&PlanetId> = BTreeSet::new();
    for planet in &galaxy.planets {
        validate_planet(planet, &galaxy.goods)?;
        if !planet_ids.insert(&planet.id) {
            return Err(ValidationError::DuplicatePlanetId(planet.id.0.clone()));
        }
    }
    Ok(())
}

/// Validate the player against the galaxy, including the travel invariant:
/// exactly one of (docked with a current planet) or (in transit with travel
/// info) holds at any time.
pub fn validate_player(player: &PlayerState, galaxy: &Galaxy) -> Result<(), ValidationError> {
    match (
        &player.current_planet_id,
        player.is_traveling,
        &player.travel_info,
    ) {
        (Some(id), false, None) => {
            if galaxy.planet(id).is_none() {
                return Err(ValidationError::UnknownPlanet(id.0.clone()));
            }
        }
        (None, true, Some(info)) => {
            for id in [&info.origin, &info.destination] {
                if galaxy.planet(id).is_none() {
                    return Err(ValidationError::UnknownPlanet(id.0.clone()));
                }
            }
        }
        _ => return Err(ValidationError::TravelStateConflict),
    }

    let ship = &player.ship;
    if ship.durability > ship.max_durability {
        return Err(ValidationError::DurabilityAboveMax);
    }
    let load = ship.cargo.load();
    if load > ship.cargo.capacity {
        return Err(ValidationError::CargoOverCapacity {
            load,
            capacity: ship.cargo.capacity,
        });
    }
    for item in &ship.cargo.items {
        if item.quantity == 0 {
            return Err(ValidationError::ZeroQuantityCargo(item.good_id.0.clone()));
        }
    }
    Ok(())
}

/// Validate a full snapshot.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    validate_galaxy(&state.galaxy)?;
    validate_player(&state.player, &state.galaxy)?;
    if let Some(bot) = &state.auto_bot {
        for id in [&bot.origin, &bot.destination] {
            if state.galaxy.planet(id).is_none() {
                return Err(ValidationError::UnknownPlanet(id.0.clone()));
            }
        }
    }
    Ok(())
}

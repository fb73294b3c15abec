//! Player-initiated state mutators: trading, repair, and upgrades.
//!
//! Every function here is total: it validates against one immutable
//! snapshot and either returns a new snapshot wrapped in [`Applied`] or a
//! typed [`ActionError`], never panicking and never touching the input.

use crate::model::{GameState, GoodId, PlanetId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Cost of restoring one point of hull integrity.
pub const REPAIR_COST_PER_POINT: u64 = 10;

/// A successful mutation: the next snapshot plus a user-facing message.
#[derive(Clone, Debug)]
pub struct Applied {
    pub state: GameState,
    pub message: String,
}

pub type ActionResult = Result<Applied, ActionError>;

/// Why a player action was rejected. All variants are recoverable; the
/// committed snapshot is unchanged.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("good '{0}' is not traded here")]
    GoodUnavailable(GoodId),
    #[error("not enough credits: required {required}, available {available}")]
    InsufficientCredits { required: u64, available: u64 },
    #[error("not enough cargo space: need {needed}, free {free}")]
    InsufficientCargoSpace { needed: u32, free: u32 },
    #[error("not enough goods to sell: held {held}, requested {requested}")]
    InsufficientGoods { held: u32, requested: u32 },
    #[error("ship is already at full durability")]
    HullAlreadyFull,
    #[error("{0} is already at max level")]
    MaxLevelReached(UpgradeTrack),
    #[error("unknown planet '{0}'")]
    UnknownPlanet(PlanetId),
    #[error("you are already on this planet")]
    AlreadyAtDestination,
    #[error("a journey is already underway")]
    AlreadyTraveling,
    #[error("the ship is not docked at a planet")]
    NotDocked,
    #[error("hull integrity is zero; the ship cannot fly")]
    ShipWrecked,
    #[error("the autopilot has control of the ship")]
    AutoPilotEngaged,
}

/// Buy `quantity` units of a good from the docked planet's market.
pub fn buy(state: &GameState, good_id: &GoodId, quantity: u32) -> ActionResult {
    let planet = state.current_planet().ok_or(ActionError::NotDocked)?;
    let entry = planet
        .market_entry(good_id)
        .ok_or_else(|| ActionError::GoodUnavailable(good_id.clone()))?;

    let cost = u64::from(entry.buy_price) * u64::from(quantity);
    if cost > state.player.credits {
        return Err(ActionError::InsufficientCredits {
            required: cost,
            available: state.player.credits,
        });
    }

    let cargo = &state.player.ship.cargo;
    if cargo.load() + quantity > cargo.capacity {
        return Err(ActionError::InsufficientCargoSpace {
            needed: quantity,
            free: cargo.free_space(),
        });
    }

    let name = state.galaxy.good_name(good_id);
    let mut next = state.clone();
    next.player.credits -= cost;
    next.player.ship.cargo.add(good_id, quantity);

    Ok(Applied {
        state: next,
        message: format!("Bought {quantity} {name} for {cost} credits."),
    })
}

/// Sell `quantity` units of a held good to the docked planet's market.
pub fn sell(state: &GameState, good_id: &GoodId, quantity: u32) -> ActionResult {
    let held = state.player.ship.cargo.quantity_of(good_id);
    if held < quantity {
        return Err(ActionError::InsufficientGoods {
            held,
            requested: quantity,
        });
    }

    let planet = state.current_planet().ok_or(ActionError::NotDocked)?;
    let entry = planet
        .market_entry(good_id)
        .ok_or_else(|| ActionError::GoodUnavailable(good_id.clone()))?;

    let proceeds = u64::from(entry.sell_price) * u64::from(quantity);
    let name = state.galaxy.good_name(good_id);

    let mut next = state.clone();
    next.player.credits += proceeds;
    next.player.ship.cargo.remove(good_id, quantity);

    Ok(Applied {
        state: next,
        message: format!("Sold {quantity} {name} for {proceeds} credits."),
    })
}

/// Restore `amount` points of hull integrity at the fixed per-point rate.
///
/// A full hull rejects any amount, including zero — callers wanting a pure
/// status check should use [`hull_status`] instead.
pub fn repair(state: &GameState, amount: u32) -> ActionResult {
    let cost = u64::from(amount) * REPAIR_COST_PER_POINT;
    if cost > state.player.credits {
        return Err(ActionError::InsufficientCredits {
            required: cost,
            available: state.player.credits,
        });
    }
    let ship = &state.player.ship;
    if ship.durability >= ship.max_durability {
        return Err(ActionError::HullAlreadyFull);
    }

    let mut next = state.clone();
    next.player.credits -= cost;
    let ship = &mut next.player.ship;
    ship.durability = (ship.durability + amount).min(ship.max_durability);
    let restored = ship.durability - state.player.ship.durability;

    Ok(Applied {
        state: next,
        message: format!("Repaired {restored} hull points for {cost} credits."),
    })
}

/// Pure hull report for callers that only want the numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HullStatus {
    pub durability: u32,
    pub max_durability: u32,
    pub missing: u32,
    /// Cost of repairing every missing point.
    pub full_repair_cost: u64,
}

pub fn hull_status(state: &GameState) -> HullStatus {
    let ship = &state.player.ship;
    let missing = ship.max_durability.saturating_sub(ship.durability);
    HullStatus {
        durability: ship.durability,
        max_durability: ship.max_durability,
        missing,
        full_repair_cost: u64::from(missing) * REPAIR_COST_PER_POINT,
    }
}

/// Ship upgrade tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeTrack {
    Cargo,
    Durability,
}

impl fmt::Display for UpgradeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeTrack::Cargo => f.write_str("cargo hold"),
            UpgradeTrack::Durability => f.write_str("hull durability"),
        }
    }
}

/// Per-track upgrade economics.
#[derive(Clone, Copy, Debug)]
pub struct UpgradeSpec {
    pub max_level: u8,
    pub base_cost: u64,
    pub cost_multiplier: f64,
    /// Capacity or max-durability gained per level.
    pub per_level: u32,
}

pub const CARGO_UPGRADE: UpgradeSpec = UpgradeSpec {
    max_level: 5,
    base_cost: 500,
    cost_multiplier: 2.0,
    per_level: 10,
};

pub const DURABILITY_UPGRADE: UpgradeSpec = UpgradeSpec {
    max_level: 5,
    base_cost: 400,
    cost_multiplier: 2.0,
    per_level: 25,
};

impl UpgradeTrack {
    pub fn spec(self) -> &'static UpgradeSpec {
        match self {
            UpgradeTrack::Cargo => &CARGO_UPGRADE,
            UpgradeTrack::Durability => &DURABILITY_UPGRADE,
        }
    }
}

/// Cost of buying the next level from `level`, `base × mult^(level-1)`
/// rounded down.
pub fn upgrade_cost(track: UpgradeTrack, level: u8) -> u64 {
    let spec = track.spec();
    let factor = spec.cost_multiplier.powi(i32::from(level) - 1);
    (spec.base_cost as f64 * factor).floor() as u64
}

/// Buy the next level on an upgrade track. The durability track also heals
/// the ship by the per-level amount.
pub fn upgrade(state: &GameState, track: UpgradeTrack) -> ActionResult {
    let spec = track.spec();
    let level = match track {
        UpgradeTrack::Cargo => state.player.ship.upgrades.cargo,
        UpgradeTrack::Durability => state.player.ship.upgrades.durability,
    };
    if level >= spec.max_level {
        return Err(ActionError::MaxLevelReached(track));
    }

    let cost = upgrade_cost(track, level);
    if cost > state.player.credits {
        return Err(ActionError::InsufficientCredits {
            required: cost,
            available: state.player.credits,
        });
    }

    let mut next = state.clone();
    next.player.credits -= cost;
    let ship = &mut next.player.ship;
    let new_level = match track {
        UpgradeTrack::Cargo => {
            ship.upgrades.cargo += 1;
            ship.cargo.capacity += spec.per_level;
            ship.upgrades.cargo
        }
        UpgradeTrack::Durability => {
            ship.upgrades.durability += 1;
            ship.max_durability += spec.per_level;
            ship.durability = (ship.durability + spec.per_level).min(ship.max_durability);
            ship.upgrades.durability
        }
    };

    Ok(Applied {
        state: next,
        message: format!("Upgraded {track} to level {new_level} for {cost} credits."),
    })
}

//! Starter world: the goods catalog, the seed planets, and the fresh-game
//! snapshot builder.

use crate::checksum;
use crate::model::{
    CargoHold, Galaxy, GameState, Good, GoodId, MarketEntry, Planet, PlanetId, PlayerState,
    Position, Ship, UpgradeLevels,
};
use crate::placement;
use chrono::{DateTime, Utc};
use rand::Rng;

pub const GALAXY_NAME: &str = "MakeMoney";
pub const SHIP_NAME: &str = "Stardust Cruiser";
pub const STARTING_CREDITS: u64 = 1000;
pub const STARTING_CAPACITY: u32 = 20;
pub const STARTING_DURABILITY: u32 = 100;
/// Planet a legacy save without a location is migrated onto.
pub const START_PLANET: &str = "terra";

fn good(id: &str, name: &str, base_price: u32) -> Good {
    Good {
        id: GoodId::new(id),
        name: name.to_string(),
        base_price,
    }
}

pub fn starter_goods() -> Vec<Good> {
    vec![
        good("water", "Aqua Pura", 20),
        good("food", "Nutri-Paste", 50),
        good("minerals", "Xenon Crystals", 150),
        good("tech", "Quantum Chips", 500),
    ]
}

fn entry(good_id: &str, buy_price: u32, sell_price: u32) -> MarketEntry {
    MarketEntry {
        good_id: GoodId::new(good_id),
        buy_price,
        sell_price,
    }
}

pub fn starter_planets() -> Vec<Planet> {
    vec![
        Planet {
            id: PlanetId::new("terra"),
            name: "Terra Prime".to_string(),
            position: Position::new(100.0, 100.0, 0.0),
            tax_rate: 0.05,
            description: "The bustling capital of the 'MakeMoney' galaxy, with a balanced \
                          economy and stable markets."
                .to_string(),
            color: "#60a5fa".to_string(),
            market: vec![
                entry("water", 22, 18),
                entry("food", 55, 45),
                entry("minerals", 160, 140),
                entry("tech", 480, 450),
            ],
        },
        Planet {
            id: PlanetId::new("aqua"),
            name: "Aqua Ventus".to_string(),
            position: Position::new(300.0, 400.0, 0.0),
            tax_rate: 0.02,
            description: "An ocean world, rich in water resources but desperate for advanced \
                          technology and minerals."
                .to_string(),
            color: "#34d399".to_string(),
            market: vec![
                entry("water", 15, 10),
                entry("food", 60, 50),
                entry("minerals", 180, 160),
                entry("tech", 550, 520),
            ],
        },
        Planet {
            id: PlanetId::new("volcanis"),
            name: "Volcanis".to_string(),
            position: Position::new(600.0, 200.0, 0.0),
            tax_rate: 0.1,
            description: "A mineral-rich volcanic planet. The harsh environment makes food \
                          and water scarce and valuable."
                .to_string(),
            color: "#f87171".to_string(),
            market: vec![
                entry("water", 35, 30),
                entry("food", 70, 60),
                entry("minerals", 120, 100),
                entry("tech", 520, 490),
            ],
        },
    ]
}

pub fn starter_galaxy() -> Galaxy {
    Galaxy {
        name: GALAXY_NAME.to_string(),
        planets: starter_planets(),
        goods: starter_goods(),
    }
}

/// Build a fresh game snapshot with re-scattered planet positions and a
/// valid integrity digest.
pub fn new_game_state(now: DateTime<Utc>, rng: &mut impl Rng) -> GameState {
    let mut galaxy = starter_galaxy();
    placement::scatter(&mut galaxy.planets, rng);

    let player = PlayerState {
        credits: STARTING_CREDITS,
        current_planet_id: Some(PlanetId::new(START_PLANET)),
        ship: Ship {
            name: SHIP_NAME.to_string(),
            durability: STARTING_DURABILITY,
            max_durability: STARTING_DURABILITY,
            cargo: CargoHold {
                capacity: STARTING_CAPACITY,
                items: vec![],
            },
            upgrades: UpgradeLevels {
                cargo: 1,
                durability: 1,
            },
        },
        is_traveling: false,
        travel_info: None,
    };

    let mut state = GameState {
        player,
        galaxy,
        last_updated: now,
        checksum: String::new(),
        auto_bot: None,
    };
    state.checksum = checksum::digest(&state);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validate_state;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fresh_world_is_valid_and_verified() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let state = new_game_state(now, &mut rng);
        validate_state(&state).unwrap();
        assert!(checksum::verify(&state));
        assert_eq!(state.player.credits, STARTING_CREDITS);
        assert_eq!(state.galaxy.planets.len(), 3);
        assert_eq!(state.galaxy.goods.len(), 4);
        // Every planet quotes every catalog good.
        for planet in &state.galaxy.planets {
            for good in &state.galaxy.goods {
                assert!(planet.market_entry(&good.id).is_some());
            }
        }
    }

    #[test]
    fn fresh_worlds_respect_separation() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let state = new_game_state(now, &mut rng);
        let planets = &state.galaxy.planets;
        for (i, a) in planets.iter().enumerate() {
            for b in planets.iter().skip(i + 1) {
                assert!(a.position.distance_2d(&b.position) >= placement::MIN_SEPARATION);
            }
        }
    }
}

//! Travel state machine: Docked -> InTransit -> Docked.
//!
//! Departure debits fuel and stamps wall-clock start/end times; travel
//! then progresses in real elapsed time with no polling required for
//! correctness. [`complete_travel`] is an idempotent check against the
//! stored arrival time, designed to be polled until it yields a docked
//! snapshot.

use crate::actions::{ActionError, ActionResult, Applied};
use crate::model::{GameState, PlanetId, TravelInfo};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Cruise speed in map units per second.
pub const SHIP_SPEED: f64 = 40.0;
/// Fuel costs `round(distance / FUEL_COST_DIVISOR)` credits.
pub const FUEL_COST_DIVISOR: f64 = 10.0;
/// Chance of hull wear on arrival.
pub const ARRIVAL_WEAR_CHANCE: f64 = 0.2;
pub const ARRIVAL_WEAR_MIN: u32 = 1;
pub const ARRIVAL_WEAR_MAX: u32 = 5;

pub fn fuel_cost(distance: f64) -> u64 {
    (distance / FUEL_COST_DIVISOR).round() as u64
}

pub fn travel_duration(distance: f64) -> Duration {
    Duration::milliseconds((distance / SHIP_SPEED * 1000.0).round() as i64)
}

/// Start a journey to `destination`, debiting fuel and switching the
/// player into the in-transit state.
pub fn initiate_travel(
    state: &GameState,
    destination: &PlanetId,
    now: DateTime<Utc>,
) -> ActionResult {
    if state.player.is_traveling {
        return Err(ActionError::AlreadyTraveling);
    }
    if state.player.ship.durability == 0 {
        return Err(ActionError::ShipWrecked);
    }
    let origin_id = state
        .player
        .current_planet_id
        .clone()
        .ok_or(ActionError::NotDocked)?;
    if &origin_id == destination {
        return Err(ActionError::AlreadyAtDestination);
    }
    let origin = state
        .galaxy
        .planet(&origin_id)
        .ok_or_else(|| ActionError::UnknownPlanet(origin_id.clone()))?;
    let dest = state
        .galaxy
        .planet(destination)
        .ok_or_else(|| ActionError::UnknownPlanet(destination.clone()))?;

    let distance = origin.position.distance(&dest.position);
    let fuel = fuel_cost(distance);
    if fuel > state.player.credits {
        return Err(ActionError::InsufficientCredits {
            required: fuel,
            available: state.player.credits,
        });
    }

    let duration = travel_duration(distance);
    let mut next = state.clone();
    next.player.credits -= fuel;
    next.player.current_planet_id = None;
    next.player.is_traveling = true;
    next.player.travel_info = Some(TravelInfo {
        origin: origin_id,
        destination: destination.clone(),
        departed_at: now,
        arrives_at: now + duration,
    });

    Ok(Applied {
        state: next,
        message: format!(
            "Departed for {}. Paid {} credits for fuel; arrival in {}s.",
            dest.name,
            fuel,
            duration.num_seconds()
        ),
    })
}

/// Finalize an in-flight journey once its arrival time has passed.
///
/// Returns `None` while no journey is underway or the arrival time is
/// still in the future. On completion it deducts the destination's
/// arrival tax and applies a probabilistic hull wear, then docks the
/// player.
pub fn complete_travel(
    state: &GameState,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Option<Applied> {
    if !state.player.is_traveling {
        return None;
    }
    let info = state.player.travel_info.as_ref()?;
    if now < info.arrives_at {
        return None;
    }
    let Some(dest) = state.galaxy.planet(&info.destination) else {
        // Deletion guards keep route planets alive; reaching this means a
        // corrupted snapshot.
        tracing::error!(destination = %info.destination, "travel destination vanished");
        return None;
    };

    let tax = (state.player.credits as f64 * f64::from(dest.tax_rate)).round() as u64;
    let wear = if rng.gen_bool(ARRIVAL_WEAR_CHANCE) {
        rng.gen_range(ARRIVAL_WEAR_MIN..=ARRIVAL_WEAR_MAX)
    } else {
        0
    };

    let dest_id = dest.id.clone();
    let dest_name = dest.name.clone();
    let mut next = state.clone();
    next.player.credits = next.player.credits.saturating_sub(tax);
    next.player.ship.durability = next.player.ship.durability.saturating_sub(wear);
    next.player.current_planet_id = Some(dest_id);
    next.player.is_traveling = false;
    next.player.travel_info = None;

    let mut message = format!("Arrived at {dest_name}. Paid {tax} credits in arrival tax.");
    if wear > 0 {
        message.push_str(&format!(" Hull took {wear} points of wear."));
    }
    if next.player.ship.durability == 0 {
        message.push_str(" The hull is wrecked; repair before flying again.");
    }

    Some(Applied {
        state: next,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::model::validate_player;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_state() -> GameState {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        catalog::new_game_state(fixed_now(), &mut rng)
    }

    fn aqua() -> PlanetId {
        PlanetId::new("aqua")
    }

    #[test]
    fn departure_switches_to_in_transit() {
        let state = sample_state();
        let departed = initiate_travel(&state, &aqua(), fixed_now()).unwrap();
        let player = &departed.state.player;
        assert!(player.is_traveling);
        assert!(player.current_planet_id.is_none());
        let info = player.travel_info.as_ref().unwrap();
        assert_eq!(info.origin, PlanetId::new("terra"));
        assert_eq!(info.destination, aqua());
        assert!(info.arrives_at > info.departed_at);
        assert!(player.credits < state.player.credits);
        validate_player(player, &departed.state.galaxy).unwrap();
        // Origin snapshot still docked.
        assert!(state.player.is_docked());
    }

    #[test]
    fn departure_rejections() {
        let mut state = sample_state();
        assert_eq!(
            initiate_travel(&state, &PlanetId::new("terra"), fixed_now()).unwrap_err(),
            ActionError::AlreadyAtDestination
        );
        assert!(matches!(
            initiate_travel(&state, &PlanetId::new("nowhere"), fixed_now()).unwrap_err(),
            ActionError::UnknownPlanet(_)
        ));

        state.player.ship.durability = 0;
        assert_eq!(
            initiate_travel(&state, &aqua(), fixed_now()).unwrap_err(),
            ActionError::ShipWrecked
        );

        let mut broke = sample_state();
        broke.player.credits = 0;
        let err = initiate_travel(&broke, &aqua(), fixed_now()).unwrap_err();
        assert!(matches!(err, ActionError::InsufficientCredits { .. }));
        // Rejection leaves the snapshot untouched and docked.
        assert!(broke.player.is_docked());
        assert_eq!(broke.player.credits, 0);
    }

    #[test]
    fn double_departure_is_rejected() {
        let state = sample_state();
        let departed = initiate_travel(&state, &aqua(), fixed_now()).unwrap();
        assert_eq!(
            initiate_travel(&departed.state, &PlanetId::new("volcanis"), fixed_now()).unwrap_err(),
            ActionError::AlreadyTraveling
        );
    }

    #[test]
    fn completion_waits_for_the_arrival_time() {
        let state = sample_state();
        let departed = initiate_travel(&state, &aqua(), fixed_now()).unwrap().state;
        let arrives_at = departed.player.travel_info.as_ref().unwrap().arrives_at;

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // Early polls are no-ops.
        assert!(complete_travel(&departed, fixed_now(), &mut rng).is_none());
        assert!(complete_travel(&departed, arrives_at - Duration::milliseconds(1), &mut rng).is_none());

        let arrived = complete_travel(&departed, arrives_at, &mut rng).unwrap();
        let player = &arrived.state.player;
        assert!(!player.is_traveling);
        assert_eq!(player.current_planet_id, Some(aqua()));
        assert!(player.travel_info.is_none());
        validate_player(player, &arrived.state.galaxy).unwrap();

        // The next poll sees a docked player and does nothing.
        assert!(complete_travel(&arrived.state, arrives_at, &mut rng).is_none());
    }

    #[test]
    fn arrival_tax_is_deducted() {
        let mut state = sample_state();
        state.player.credits = 10_000;
        // Volcanis taxes 10%.
        let dest = PlanetId::new("volcanis");
        let departed = initiate_travel(&state, &dest, fixed_now()).unwrap().state;
        let credits_in_flight = departed.player.credits;
        let arrives_at = departed.player.travel_info.as_ref().unwrap().arrives_at;

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let arrived = complete_travel(&departed, arrives_at, &mut rng).unwrap();
        let tax_rate = departed.galaxy.planet(&dest).unwrap().tax_rate;
        let expected_tax = (credits_in_flight as f64 * f64::from(tax_rate)).round() as u64;
        assert_eq!(arrived.state.player.credits, credits_in_flight - expected_tax);
    }

    #[test]
    fn docked_player_never_completes() {
        let state = sample_state();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(complete_travel(&state, fixed_now(), &mut rng).is_none());
    }

    proptest! {
        // Across arbitrary arrival RNG seeds the travel invariant holds and
        // wear stays within bounds.
        #[test]
        fn arrival_invariants(seed in 0u64..500) {
            let state = sample_state();
            let departed = initiate_travel(&state, &aqua(), fixed_now()).unwrap().state;
            let arrives_at = departed.player.travel_info.as_ref().unwrap().arrives_at;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let arrived = complete_travel(&departed, arrives_at, &mut rng).unwrap();
            let ship = &arrived.state.player.ship;
            prop_assert!(ship.durability >= departed.player.ship.durability - ARRIVAL_WEAR_MAX);
            prop_assert!(ship.durability <= departed.player.ship.durability);
            prop_assert!(validate_player(&arrived.state.player, &arrived.state.galaxy).is_ok());
        }
    }
}

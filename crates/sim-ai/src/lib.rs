#![deny(warnings)]

//! The AutoBot: an unattended trading agent running a fixed four-task
//! cycle — buy at the origin, haul to the destination, sell, haul back —
//! until its mission deadline passes or a leg fails.
//!
//! [`tick`] is the pure transition function; scheduling it on a period
//! belongs to the runtime. Each tick performs at most one side-effecting
//! action, so a freshly arrived ship switches task on one tick and trades
//! on the next.

use chrono::{DateTime, Duration, Utc};
use sim_core::actions::{self, Applied};
use sim_core::model::{
    AutoBotState, AutoBotTask, GameState, GoodId, PlanetId, Severity,
};
use sim_core::travel;
use std::collections::VecDeque;
use thiserror::Error;

/// Caller-supplied mission parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MissionConfig {
    pub good_id: GoodId,
    /// Units targeted per buy leg; actual purchases are further limited by
    /// cargo space and credits.
    pub trade_quantity: u32,
    pub destination: PlanetId,
    pub duration_minutes: i64,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MissionError {
    #[error("the ship must be docked to start a mission")]
    NotDocked,
    #[error("mission destination must differ from the current planet")]
    DestinationIsOrigin,
    #[error("unknown planet '{0}'")]
    UnknownPlanet(PlanetId),
    #[error("'{0}' is not sold at the origin planet")]
    GoodNotSoldAtOrigin(GoodId),
    #[error("trade quantity must be positive")]
    ZeroQuantity,
    #[error("mission duration must be positive")]
    ZeroDuration,
    #[error("a mission is already active")]
    MissionAlreadyActive,
    #[error("no mission is active")]
    NoMission,
}

/// Result of one tick: the next snapshot plus notification events for the
/// orchestration layer. Log lines inside the bot state cover routine
/// progress; events are reserved for mission start/end and failures.
#[derive(Clone, Debug)]
pub struct TickOutcome {
    pub state: GameState,
    pub events: Vec<(Severity, String)>,
}

/// Engage the AutoBot from a docked position.
pub fn start_mission(
    state: &GameState,
    config: &MissionConfig,
    now: DateTime<Utc>,
) -> Result<Applied, MissionError> {
    if state.autobot_active() {
        return Err(MissionError::MissionAlreadyActive);
    }
    if config.trade_quantity == 0 {
        return Err(MissionError::ZeroQuantity);
    }
    if config.duration_minutes <= 0 {
        return Err(MissionError::ZeroDuration);
    }
    if !state.player.is_docked() {
        return Err(MissionError::NotDocked);
    }
    let origin = state
        .player
        .current_planet_id
        .clone()
        .ok_or(MissionError::NotDocked)?;
    if origin == config.destination {
        return Err(MissionError::DestinationIsOrigin);
    }
    let dest = state
        .galaxy
        .planet(&config.destination)
        .ok_or_else(|| MissionError::UnknownPlanet(config.destination.clone()))?;
    let origin_planet = state
        .galaxy
        .planet(&origin)
        .ok_or_else(|| MissionError::UnknownPlanet(origin.clone()))?;
    if origin_planet.market_entry(&config.good_id).is_none() {
        return Err(MissionError::GoodNotSoldAtOrigin(config.good_id.clone()));
    }

    let deadline = now + Duration::minutes(config.duration_minutes);
    let mut bot = AutoBotState {
        is_active: true,
        started_at: now,
        deadline,
        origin: origin.clone(),
        destination: config.destination.clone(),
        good_id: config.good_id.clone(),
        trade_quantity: config.trade_quantity,
        current_task: AutoBotTask::Buying,
        logs: VecDeque::new(),
    };
    bot.push_log(
        now,
        format!(
            "Mission started: trading {} between {} and {} until {}.",
            state.galaxy.good_name(&config.good_id),
            origin_planet.name,
            dest.name,
            deadline.format("%H:%M:%S"),
        ),
    );

    let mut next = state.clone();
    next.auto_bot = Some(bot);
    tracing::info!(good = %config.good_id, destination = %config.destination, "autobot engaged");

    Ok(Applied {
        state: next,
        message: "AutoBot engaged.".to_string(),
    })
}

/// Manually disengage the AutoBot.
pub fn stop_mission(state: &GameState) -> Result<Applied, MissionError> {
    if !state.autobot_active() {
        return Err(MissionError::NoMission);
    }
    let mut next = state.clone();
    next.auto_bot = None;
    tracing::info!("autobot disengaged");
    Ok(Applied {
        state: next,
        message: "AutoBot disengaged.".to_string(),
    })
}

fn log_to(state: &mut GameState, now: DateTime<Utc>, message: &str) {
    if let Some(bot) = state.auto_bot.as_mut() {
        bot.push_log(now, message);
    }
}

/// Advance the mission by one step against the committed snapshot.
///
/// Returns `None` when there is nothing to do: no active mission, or the
/// ship is mid-travel and the deadline has not passed. Ticking while in
/// transit must never issue a second travel command.
pub fn tick(state: &GameState, now: DateTime<Utc>) -> Option<TickOutcome> {
    let bot = state.auto_bot.as_ref().filter(|b| b.is_active)?;

    // Deadline first, even while airborne.
    if now >= bot.deadline {
        let mut next = state.clone();
        next.auto_bot = None;
        tracing::info!("autobot mission deadline reached");
        return Some(TickOutcome {
            state: next,
            events: vec![(
                Severity::Success,
                "AutoBot mission complete: deadline reached.".to_string(),
            )],
        });
    }

    if state.player.is_traveling {
        return None;
    }

    let docked_at = state.player.current_planet_id.as_ref()?;

    match bot.current_task {
        AutoBotTask::TravelingToSell if docked_at == &bot.destination => {
            let mut next = state.clone();
            if let Some(b) = next.auto_bot.as_mut() {
                b.current_task = AutoBotTask::Selling;
            }
            let name = state.galaxy.good_name(&bot.good_id);
            log_to(
                &mut next,
                now,
                &format!("Arrived at the sell planet; unloading {name} next."),
            );
            Some(TickOutcome {
                state: next,
                events: vec![],
            })
        }
        AutoBotTask::TravelingToBuy if docked_at == &bot.origin => {
            let mut next = state.clone();
            if let Some(b) = next.auto_bot.as_mut() {
                b.current_task = AutoBotTask::Buying;
            }
            log_to(&mut next, now, "Back at the buy planet; restocking next.");
            Some(TickOutcome {
                state: next,
                events: vec![],
            })
        }
        AutoBotTask::Buying => Some(buy_leg(state, bot, now)),
        AutoBotTask::Selling => Some(sell_leg(state, bot, now)),
        // Docked somewhere that is not a task endpoint; wait for the
        // travel watcher to catch up.
        AutoBotTask::TravelingToSell | AutoBotTask::TravelingToBuy => None,
    }
}

/// Buy up to the configured quantity, then head for the sell planet.
fn buy_leg(state: &GameState, bot: &AutoBotState, now: DateTime<Utc>) -> TickOutcome {
    let good_id = bot.good_id.clone();
    let destination = bot.destination.clone();
    let mut next = state.clone();
    let mut events = Vec::new();

    let listed_price = state
        .current_planet()
        .and_then(|p| p.market_entry(&good_id))
        .map(|e| e.buy_price);
    let quantity = match listed_price {
        Some(price) => {
            let affordable = state.player.credits / u64::from(price.max(1));
            let free = state.player.ship.cargo.free_space();
            u64::from(bot.trade_quantity)
                .min(u64::from(free))
                .min(affordable) as u32
        }
        None => 0,
    };

    if quantity > 0 {
        match actions::buy(&next, &good_id, quantity) {
            Ok(Applied { state, message }) => {
                next = state;
                log_to(&mut next, now, &message);
            }
            Err(err) => log_to(&mut next, now, &format!("Buy failed: {err}")),
        }
    } else {
        log_to(&mut next, now, "Nothing bought: no funds, space, or listing.");
    }

    match travel::initiate_travel(&next, &destination, now) {
        Ok(applied) => {
            next = applied.state;
            if let Some(b) = next.auto_bot.as_mut() {
                b.current_task = AutoBotTask::TravelingToSell;
                b.push_log(now, &applied.message);
            }
        }
        Err(err) => {
            tracing::warn!(%err, "autobot travel leg failed, deactivating");
            next.auto_bot = None;
            events.push((
                Severity::Error,
                format!("AutoBot mission aborted: {err}"),
            ));
        }
    }

    TickOutcome { state: next, events }
}

/// Sell everything held of the mission good, then head home.
fn sell_leg(state: &GameState, bot: &AutoBotState, now: DateTime<Utc>) -> TickOutcome {
    let good_id = bot.good_id.clone();
    let origin = bot.origin.clone();
    let mut next = state.clone();
    let mut events = Vec::new();

    let held = state.player.ship.cargo.quantity_of(&good_id);
    if held > 0 {
        match actions::sell(&next, &good_id, held) {
            Ok(Applied { state, message }) => {
                next = state;
                log_to(&mut next, now, &message);
            }
            Err(err) => log_to(&mut next, now, &format!("Sell failed: {err}")),
        }
    } else {
        log_to(&mut next, now, "No cargo to sell.");
    }

    match travel::initiate_travel(&next, &origin, now) {
        Ok(applied) => {
            next = applied.state;
            if let Some(b) = next.auto_bot.as_mut() {
                b.current_task = AutoBotTask::TravelingToBuy;
                b.push_log(now, &applied.message);
            }
        }
        Err(err) => {
            tracing::warn!(%err, "autobot travel leg failed, deactivating");
            next.auto_bot = None;
            events.push((
                Severity::Error,
                format!("AutoBot mission aborted: {err}"),
            ));
        }
    }

    TickOutcome { state: next, events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::catalog;
    use sim_core::model::validate_state;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_state() -> GameState {
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        catalog::new_game_state(fixed_now(), &mut rng)
    }

    fn water_run() -> MissionConfig {
        MissionConfig {
            good_id: GoodId::new("water"),
            trade_quantity: 5,
            destination: PlanetId::new("aqua"),
            duration_minutes: 30,
        }
    }

    /// Drive the travel watcher until the ship docks.
    fn land(state: &GameState) -> (GameState, DateTime<Utc>) {
        let arrives_at = state.player.travel_info.as_ref().unwrap().arrives_at;
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let applied = travel::complete_travel(state, arrives_at, &mut rng).unwrap();
        (applied.state, arrives_at)
    }

    #[test]
    fn start_mission_validations() {
        let state = sample_state();

        let mut cfg = water_run();
        cfg.destination = PlanetId::new("terra");
        assert_eq!(
            start_mission(&state, &cfg, fixed_now()).unwrap_err(),
            MissionError::DestinationIsOrigin
        );

        let mut cfg = water_run();
        cfg.trade_quantity = 0;
        assert_eq!(
            start_mission(&state, &cfg, fixed_now()).unwrap_err(),
            MissionError::ZeroQuantity
        );

        let mut cfg = water_run();
        cfg.duration_minutes = 0;
        assert_eq!(
            start_mission(&state, &cfg, fixed_now()).unwrap_err(),
            MissionError::ZeroDuration
        );

        let mut cfg = water_run();
        cfg.good_id = GoodId::new("spice");
        assert!(matches!(
            start_mission(&state, &cfg, fixed_now()).unwrap_err(),
            MissionError::GoodNotSoldAtOrigin(_)
        ));

        let started = start_mission(&state, &water_run(), fixed_now()).unwrap();
        assert_eq!(
            start_mission(&started.state, &water_run(), fixed_now()).unwrap_err(),
            MissionError::MissionAlreadyActive
        );
    }

    #[test]
    fn full_cycle_buys_hauls_and_sells() {
        let state = sample_state();
        let now = fixed_now();
        let state = start_mission(&state, &water_run(), now).unwrap().state;
        assert!(state.autobot_active());

        // Tick 1: buy at terra and depart for aqua.
        let out = tick(&state, now).unwrap();
        let state = out.state;
        assert!(state.player.is_traveling);
        assert_eq!(state.player.ship.cargo.quantity_of(&GoodId::new("water")), 5);
        assert_eq!(
            state.auto_bot.as_ref().unwrap().current_task,
            AutoBotTask::TravelingToSell
        );

        // In transit: ticks are no-ops.
        assert!(tick(&state, now).is_none());

        let (state, landed_at) = land(&state);
        assert_eq!(state.player.current_planet_id, Some(PlanetId::new("aqua")));

        // Arrival tick only flips the task.
        let out = tick(&state, landed_at).unwrap();
        let state = out.state;
        assert_eq!(
            state.auto_bot.as_ref().unwrap().current_task,
            AutoBotTask::Selling
        );
        assert_eq!(state.player.ship.cargo.quantity_of(&GoodId::new("water")), 5);

        // Sell tick: unload and head home.
        let out = tick(&state, landed_at).unwrap();
        let state = out.state;
        assert!(state.player.is_traveling);
        assert!(state.player.ship.cargo.items.is_empty());
        assert_eq!(
            state.auto_bot.as_ref().unwrap().current_task,
            AutoBotTask::TravelingToBuy
        );

        let (state, landed_at) = land(&state);
        let out = tick(&state, landed_at).unwrap();
        let state = out.state;
        assert_eq!(
            state.auto_bot.as_ref().unwrap().current_task,
            AutoBotTask::Buying
        );
        validate_state(&state).unwrap();
        assert!(!state.auto_bot.as_ref().unwrap().logs.is_empty());
    }

    #[test]
    fn deadline_deactivates_the_bot() {
        let state = sample_state();
        let now = fixed_now();
        let state = start_mission(&state, &water_run(), now).unwrap().state;
        let deadline = state.auto_bot.as_ref().unwrap().deadline;

        let out = tick(&state, deadline).unwrap();
        assert!(out.state.auto_bot.is_none());
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].0, Severity::Success);
    }

    #[test]
    fn deadline_fires_even_mid_travel() {
        let state = sample_state();
        let now = fixed_now();
        let state = start_mission(&state, &water_run(), now).unwrap().state;
        let state = tick(&state, now).unwrap().state;
        assert!(state.player.is_traveling);

        let deadline = state.auto_bot.as_ref().unwrap().deadline;
        let out = tick(&state, deadline).unwrap();
        assert!(out.state.auto_bot.is_none());
        // The travel leg itself is untouched; it resolves by elapsed time.
        assert!(out.state.player.is_traveling);
    }

    #[test]
    fn failed_travel_leg_aborts_the_mission() {
        let mut state = sample_state();
        let now = fixed_now();
        state = start_mission(&state, &water_run(), now).unwrap().state;
        // No credits: nothing to buy and no fuel for the outbound leg.
        state.player.credits = 0;

        let out = tick(&state, now).unwrap();
        assert!(out.state.auto_bot.is_none());
        assert!(!out.state.player.is_traveling);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].0, Severity::Error);
    }

    #[test]
    fn sell_leg_with_empty_hold_is_not_an_error() {
        let state = sample_state();
        let now = fixed_now();
        let mut state = start_mission(&state, &water_run(), now).unwrap().state;
        // Teleport the mission into the selling phase with nothing held.
        state.player.current_planet_id = Some(PlanetId::new("aqua"));
        state.auto_bot.as_mut().unwrap().current_task = AutoBotTask::Selling;

        let out = tick(&state, now).unwrap();
        assert!(out.state.autobot_active());
        assert!(out.state.player.is_traveling);
        assert_eq!(
            out.state.auto_bot.as_ref().unwrap().current_task,
            AutoBotTask::TravelingToBuy
        );
    }

    #[test]
    fn stop_mission_clears_the_bot() {
        let state = sample_state();
        assert_eq!(stop_mission(&state).unwrap_err(), MissionError::NoMission);
        let state = start_mission(&state, &water_run(), fixed_now()).unwrap().state;
        let stopped = stop_mission(&state).unwrap();
        assert!(stopped.state.auto_bot.is_none());
    }

    #[test]
    fn idle_without_a_mission() {
        let state = sample_state();
        assert!(tick(&state, fixed_now()).is_none());
    }
}

//! Planet administration: add, edit, and decommission planets.
//!
//! Creation and editing are two-phase: the async entry points await the
//! market generation service first, then hand the validated table to a
//! synchronous mutator. Orchestrators that must not hold a state lock
//! across the await can run the phases separately via
//! [`generate_market`] plus the `*_with_market` mutators; either way a
//! service failure commits nothing.

use crate::source::{validate_market, MarketGenError, MarketSource};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::actions::Applied;
use sim_core::model::{GameState, MarketEntry, Planet, PlanetId};
use sim_core::placement;
use thiserror::Error;

/// Caller-supplied fields for a new or edited planet. Position and market
/// are always derived, never accepted from the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanetDraft {
    pub name: String,
    pub description: String,
    pub tax_rate: f32,
    pub color: String,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PlanetAdminError {
    #[error("planet name must not be empty")]
    EmptyName,
    #[error("planet description must not be empty")]
    EmptyDescription,
    #[error("tax rate {0} is outside [0, 1)")]
    TaxRateOutOfRange(f32),
    #[error("unknown planet '{0}'")]
    UnknownPlanet(PlanetId),
    #[error("another change to planet '{0}' is still in flight")]
    PlanetBusy(PlanetId),
    #[error("cannot delete the last planet in the galaxy")]
    LastPlanet,
    #[error("cannot delete the planet the ship is docked at")]
    PlanetOccupied,
    #[error("cannot delete a planet on the active travel route")]
    PlanetOnRoute,
    #[error("cannot delete a planet used by the active AutoBot mission")]
    PlanetOnMission,
    #[error(transparent)]
    MarketGen(#[from] MarketGenError),
}

pub fn validate_draft(draft: &PlanetDraft) -> Result<(), PlanetAdminError> {
    if draft.name.trim().is_empty() {
        return Err(PlanetAdminError::EmptyName);
    }
    if draft.description.trim().is_empty() {
        return Err(PlanetAdminError::EmptyDescription);
    }
    if !(0.0..1.0).contains(&draft.tax_rate) || !draft.tax_rate.is_finite() {
        return Err(PlanetAdminError::TaxRateOutOfRange(draft.tax_rate));
    }
    Ok(())
}

/// Derive a unique id from the display name: lowercase alphanumerics with
/// dashes, suffixed with a counter on collision.
pub fn slug_for(name: &str, state: &GameState) -> PlanetId {
    let mut slug = String::new();
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    let base = if slug.is_empty() { "planet".to_string() } else { slug };

    let taken = |id: &PlanetId| state.galaxy.planet(id).is_some();
    let mut candidate = PlanetId::new(base.clone());
    let mut counter = 2;
    while taken(&candidate) {
        candidate = PlanetId::new(format!("{base}-{counter}"));
        counter += 1;
    }
    candidate
}

/// Validate a draft and run the market generation service for it.
pub async fn generate_market(
    draft: &PlanetDraft,
    state: &GameState,
    source: &dyn MarketSource,
) -> Result<Vec<MarketEntry>, PlanetAdminError> {
    validate_draft(draft)?;
    let market = source.generate(draft, &state.galaxy.goods).await?;
    validate_market(&market, &state.galaxy.goods)?;
    Ok(market)
}

/// Place and append a new planet using an already-generated market table.
pub fn add_planet_with_market(
    state: &GameState,
    draft: &PlanetDraft,
    market: Vec<MarketEntry>,
    rng: &mut impl Rng,
) -> Result<Applied, PlanetAdminError> {
    validate_draft(draft)?;
    validate_market(&market, &state.galaxy.goods)?;

    let id = slug_for(&draft.name, state);
    let placed: Vec<_> = state.galaxy.planets.iter().map(|p| p.position).collect();
    let position = placement::place(&placed, rng);

    let mut next = state.clone();
    next.galaxy.planets.push(Planet {
        id: id.clone(),
        name: draft.name.clone(),
        position,
        tax_rate: draft.tax_rate,
        description: draft.description.clone(),
        color: draft.color.clone(),
        market,
    });
    tracing::info!(planet = %id, "planet added");

    Ok(Applied {
        state: next,
        message: format!("Planet {} charted; market generated.", draft.name),
    })
}

/// Merge an edited draft and a freshly generated market onto an existing
/// planet. Id and position are preserved.
pub fn update_planet_with_market(
    state: &GameState,
    id: &PlanetId,
    draft: &PlanetDraft,
    market: Vec<MarketEntry>,
) -> Result<Applied, PlanetAdminError> {
    validate_draft(draft)?;
    validate_market(&market, &state.galaxy.goods)?;
    if state.galaxy.planet(id).is_none() {
        return Err(PlanetAdminError::UnknownPlanet(id.clone()));
    }

    let mut next = state.clone();
    for planet in &mut next.galaxy.planets {
        if &planet.id == id {
            planet.name = draft.name.clone();
            planet.description = draft.description.clone();
            planet.tax_rate = draft.tax_rate;
            planet.color = draft.color.clone();
            planet.market = market;
            break;
        }
    }
    tracing::info!(planet = %id, "planet updated");

    Ok(Applied {
        state: next,
        message: format!("Planet {} updated; market regenerated.", draft.name),
    })
}

/// Add a planet, awaiting the market service inline. Fails atomically:
/// a service error leaves no trace in the returned state.
pub async fn add_planet(
    state: &GameState,
    draft: &PlanetDraft,
    source: &dyn MarketSource,
    rng: &mut (impl Rng + Send),
) -> Result<Applied, PlanetAdminError> {
    let market = generate_market(draft, state, source).await?;
    add_planet_with_market(state, draft, market, rng)
}

/// Edit a planet, awaiting the market service inline.
pub async fn update_planet(
    state: &GameState,
    id: &PlanetId,
    draft: &PlanetDraft,
    source: &dyn MarketSource,
) -> Result<Applied, PlanetAdminError> {
    if state.galaxy.planet(id).is_none() {
        return Err(PlanetAdminError::UnknownPlanet(id.clone()));
    }
    let market = generate_market(draft, state, source).await?;
    update_planet_with_market(state, id, draft, market)
}

/// Remove a planet and its market entries, subject to the guard
/// invariants: never the last planet, never the player's location or an
/// endpoint of the active travel leg, never a planet referenced by a
/// running AutoBot mission.
pub fn delete_planet(state: &GameState, id: &PlanetId) -> Result<Applied, PlanetAdminError> {
    let planet = state
        .galaxy
        .planet(id)
        .ok_or_else(|| PlanetAdminError::UnknownPlanet(id.clone()))?;
    if state.galaxy.planets.len() <= 1 {
        return Err(PlanetAdminError::LastPlanet);
    }
    if state.player.current_planet_id.as_ref() == Some(id) {
        return Err(PlanetAdminError::PlanetOccupied);
    }
    if let Some(info) = &state.player.travel_info {
        if &info.origin == id || &info.destination == id {
            return Err(PlanetAdminError::PlanetOnRoute);
        }
    }
    if let Some(bot) = &state.auto_bot {
        if bot.is_active && (&bot.origin == id || &bot.destination == id) {
            return Err(PlanetAdminError::PlanetOnMission);
        }
    }

    let name = planet.name.clone();
    let mut next = state.clone();
    next.galaxy.planets.retain(|p| &p.id != id);
    tracing::info!(planet = %id, "planet deleted");

    Ok(Applied {
        state: next,
        message: format!("Planet {name} decommissioned."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BasePriceMarketSource;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::model::{validate_state, AutoBotState, AutoBotTask, Good, GoodId};
    use sim_core::{catalog, travel};
    use std::collections::VecDeque;

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_state() -> GameState {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        catalog::new_game_state(fixed_now(), &mut rng)
    }

    fn draft(name: &str) -> PlanetDraft {
        PlanetDraft {
            name: name.to_string(),
            description: "A frontier world of storms and salvage.".to_string(),
            tax_rate: 0.04,
            color: "#c084fc".to_string(),
        }
    }

    struct FailingSource;

    #[async_trait]
    impl MarketSource for FailingSource {
        async fn generate(
            &self,
            _draft: &PlanetDraft,
            _goods: &[Good],
        ) -> Result<Vec<MarketEntry>, MarketGenError> {
            Err(MarketGenError::Service("economists on strike".to_string()))
        }
    }

    #[tokio::test]
    async fn add_planet_appends_a_valid_world() {
        let state = sample_state();
        let source = BasePriceMarketSource::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let applied = add_planet(&state, &draft("New Haven"), &source, &mut rng)
            .await
            .unwrap();
        assert_eq!(applied.state.galaxy.planets.len(), 4);
        validate_state(&applied.state).unwrap();
        let added = applied.state.galaxy.planet(&PlanetId::new("new-haven")).unwrap();
        assert_eq!(added.market.len(), applied.state.galaxy.goods.len());
        // Input snapshot untouched.
        assert_eq!(state.galaxy.planets.len(), 3);
    }

    #[tokio::test]
    async fn service_failure_commits_nothing() {
        let state = sample_state();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = add_planet(&state, &draft("Doomed"), &FailingSource, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlanetAdminError::MarketGen(MarketGenError::Service(_))
        ));

        let err = update_planet(&state, &PlanetId::new("aqua"), &draft("Aqua II"), &FailingSource)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanetAdminError::MarketGen(_)));
    }

    #[tokio::test]
    async fn update_planet_keeps_id_and_position() {
        let state = sample_state();
        let source = BasePriceMarketSource::new(4);
        let id = PlanetId::new("aqua");
        let before = state.galaxy.planet(&id).unwrap().clone();
        let applied = update_planet(&state, &id, &draft("Aqua Reborn"), &source)
            .await
            .unwrap();
        let after = applied.state.galaxy.planet(&id).unwrap();
        assert_eq!(after.name, "Aqua Reborn");
        assert_eq!(after.position, before.position);
        assert_ne!(after.market, before.market);
        validate_state(&applied.state).unwrap();
    }

    #[test]
    fn draft_validation() {
        let mut d = draft("ok");
        d.name = "  ".to_string();
        assert_eq!(validate_draft(&d), Err(PlanetAdminError::EmptyName));
        let mut d = draft("ok");
        d.tax_rate = 1.0;
        assert!(matches!(
            validate_draft(&d),
            Err(PlanetAdminError::TaxRateOutOfRange(_))
        ));
    }

    #[test]
    fn slugs_are_unique_and_clean() {
        let state = sample_state();
        assert_eq!(slug_for("New Haven IV", &state), PlanetId::new("new-haven-iv"));
        // Collides with the starter planet id.
        assert_eq!(slug_for("Terra", &state), PlanetId::new("terra-2"));
        assert_eq!(slug_for("!!!", &state), PlanetId::new("planet"));
    }

    #[test]
    fn delete_guards_hold_without_mutation() {
        let state = sample_state();

        // Occupied planet (player docked at terra).
        assert_eq!(
            delete_planet(&state, &PlanetId::new("terra")).unwrap_err(),
            PlanetAdminError::PlanetOccupied
        );

        // Travel route endpoints.
        let departed = travel::initiate_travel(&state, &PlanetId::new("aqua"), fixed_now())
            .unwrap()
            .state;
        assert_eq!(
            delete_planet(&departed, &PlanetId::new("aqua")).unwrap_err(),
            PlanetAdminError::PlanetOnRoute
        );
        assert_eq!(
            delete_planet(&departed, &PlanetId::new("terra")).unwrap_err(),
            PlanetAdminError::PlanetOnRoute
        );

        // AutoBot mission endpoints.
        let mut with_bot = sample_state();
        with_bot.auto_bot = Some(AutoBotState {
            is_active: true,
            started_at: fixed_now(),
            deadline: fixed_now() + chrono::Duration::minutes(5),
            origin: PlanetId::new("terra"),
            destination: PlanetId::new("volcanis"),
            good_id: GoodId::new("water"),
            trade_quantity: 10,
            current_task: AutoBotTask::Buying,
            logs: VecDeque::new(),
        });
        assert_eq!(
            delete_planet(&with_bot, &PlanetId::new("volcanis")).unwrap_err(),
            PlanetAdminError::PlanetOnMission
        );

        // Unknown planet.
        assert!(matches!(
            delete_planet(&state, &PlanetId::new("nowhere")).unwrap_err(),
            PlanetAdminError::UnknownPlanet(_)
        ));

        // Last planet.
        let mut lone = sample_state();
        lone.galaxy.planets.truncate(1);
        assert_eq!(
            delete_planet(&lone, &PlanetId::new("terra")).unwrap_err(),
            PlanetAdminError::LastPlanet
        );

        // None of the rejections touched the snapshot.
        assert_eq!(state.galaxy.planets.len(), 3);
    }

    #[test]
    fn delete_removes_planet_and_market() {
        let state = sample_state();
        let applied = delete_planet(&state, &PlanetId::new("volcanis")).unwrap();
        assert_eq!(applied.state.galaxy.planets.len(), 2);
        assert!(applied
            .state
            .galaxy
            .planet(&PlanetId::new("volcanis"))
            .is_none());
        validate_state(&applied.state).unwrap();
    }
}

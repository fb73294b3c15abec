//! Player-facing command surface of the engine.
//!
//! Commands route through [`crate::store::GameStore::apply`], so each one
//! commits, persists, and notifies atomically with respect to the timers.
//! While an AutoBot mission is active the manual ship commands are
//! rejected, keeping a single agent in control of the ship.

use crate::Engine;
use chrono::Utc;
use sim_ai::{MissionConfig, MissionError};
use sim_core::actions::{self, ActionError, HullStatus, UpgradeTrack};
use sim_core::model::{GoodId, PlanetId, Severity};
use sim_core::{catalog, travel};
use sim_econ::admin;
use sim_econ::{PlanetAdminError, PlanetDraft};

impl Engine {
    /// Manual ship actions are locked out while the AutoBot flies.
    fn guard_manual(&self) -> Result<(), ActionError> {
        if self.snapshot().autobot_active() {
            let err = ActionError::AutoPilotEngaged;
            self.notify_err(&err);
            return Err(err);
        }
        Ok(())
    }

    fn notify_err(&self, err: &impl std::fmt::Display) {
        self.store().sink().notify(Severity::Error, &err.to_string());
    }

    pub fn buy(&self, good_id: &GoodId, quantity: u32) -> Result<(), ActionError> {
        self.guard_manual()?;
        self.store().apply(|s| actions::buy(s, good_id, quantity))?;
        Ok(())
    }

    pub fn sell(&self, good_id: &GoodId, quantity: u32) -> Result<(), ActionError> {
        self.guard_manual()?;
        self.store().apply(|s| actions::sell(s, good_id, quantity))?;
        Ok(())
    }

    pub fn repair(&self, amount: u32) -> Result<(), ActionError> {
        self.guard_manual()?;
        self.store().apply(|s| actions::repair(s, amount))?;
        Ok(())
    }

    pub fn upgrade(&self, track: UpgradeTrack) -> Result<(), ActionError> {
        self.guard_manual()?;
        self.store().apply(|s| actions::upgrade(s, track))?;
        Ok(())
    }

    pub fn hull_status(&self) -> HullStatus {
        actions::hull_status(&self.snapshot())
    }

    pub fn travel_to(&self, destination: &PlanetId) -> Result<(), ActionError> {
        self.guard_manual()?;
        self.store()
            .apply(|s| travel::initiate_travel(s, destination, Utc::now()))?;
        Ok(())
    }

    pub fn start_autobot(&self, config: &MissionConfig) -> Result<(), MissionError> {
        self.store()
            .apply(|s| sim_ai::start_mission(s, config, Utc::now()))?;
        Ok(())
    }

    pub fn stop_autobot(&self) -> Result<(), MissionError> {
        self.store().apply(sim_ai::stop_mission)?;
        Ok(())
    }

    /// Chart a new planet. The market service call suspends without
    /// holding the state lock; the planet appears in the committed state
    /// only after the service succeeds, atomically at commit time.
    pub async fn add_planet(&self, draft: &PlanetDraft) -> Result<(), PlanetAdminError> {
        let id = admin::slug_for(&draft.name, &self.snapshot());
        self.begin_admin(id.clone())?;
        let result = self.add_planet_inner(draft).await;
        self.end_admin(&id);
        result
    }

    async fn add_planet_inner(&self, draft: &PlanetDraft) -> Result<(), PlanetAdminError> {
        let snapshot = self.snapshot();
        let market = match admin::generate_market(draft, &snapshot, self.source()).await {
            Ok(market) => market,
            Err(err) => {
                self.notify_err(&err);
                return Err(err);
            }
        };
        let mut rng = self.rng();
        self.store()
            .apply(|s| admin::add_planet_with_market(s, draft, market, &mut *rng))?;
        Ok(())
    }

    /// Edit a planet, regenerating its market.
    pub async fn update_planet(
        &self,
        id: &PlanetId,
        draft: &PlanetDraft,
    ) -> Result<(), PlanetAdminError> {
        self.begin_admin(id.clone())?;
        let result = self.update_planet_inner(id, draft).await;
        self.end_admin(id);
        result
    }

    async fn update_planet_inner(
        &self,
        id: &PlanetId,
        draft: &PlanetDraft,
    ) -> Result<(), PlanetAdminError> {
        let snapshot = self.snapshot();
        if snapshot.galaxy.planet(id).is_none() {
            let err = PlanetAdminError::UnknownPlanet(id.clone());
            self.notify_err(&err);
            return Err(err);
        }
        let market = match admin::generate_market(draft, &snapshot, self.source()).await {
            Ok(market) => market,
            Err(err) => {
                self.notify_err(&err);
                return Err(err);
            }
        };
        self.store()
            .apply(|s| admin::update_planet_with_market(s, id, draft, market))?;
        Ok(())
    }

    pub fn delete_planet(&self, id: &PlanetId) -> Result<(), PlanetAdminError> {
        self.begin_admin(id.clone())?;
        let result = self
            .store()
            .apply(|s| admin::delete_planet(s, id))
            .map(|_| ());
        self.end_admin(id);
        result
    }

    /// Persist on demand with a visible confirmation.
    pub fn save_game(&self) {
        if self.store().save_now() {
            self.store().sink().notify(Severity::Success, "Game saved!");
        } else {
            self.store()
                .sink()
                .notify(Severity::Error, "Saving failed; progress is at risk.");
        }
    }

    /// Discard the committed world and start over.
    pub fn new_game(&self) {
        let now = Utc::now();
        let state = {
            let mut rng = self.rng();
            catalog::new_game_state(now, &mut *rng)
        };
        self.store().advance(|_| {
            Some((
                state,
                vec![(Severity::Info, "A new journey begins!".to_string())],
            ))
        });
    }
}

//! Planet placement on the galactic map.
//!
//! Rejection sampling: draw uniform positions inside the padded map bounds
//! and accept the first one whose 2-D distance to every already-placed
//! planet meets the minimum separation. When the attempt cap is exhausted
//! the last sample is kept even if it violates separation — an intentional
//! relaxation under crowding, not a bug.

use crate::model::Position;
use rand::Rng;

pub const MAP_WIDTH: f64 = 800.0;
pub const MAP_HEIGHT: f64 = 600.0;
pub const MAP_PADDING: f64 = 50.0;
/// Minimum 2-D distance between any two planets.
pub const MIN_SEPARATION: f64 = 150.0;
pub const MAX_ATTEMPTS: u32 = 100;
pub const DEPTH_RANGE: f64 = 50.0;

fn sample(rng: &mut impl Rng) -> Position {
    Position::new(
        rng.gen_range(MAP_PADDING..=MAP_WIDTH - MAP_PADDING),
        rng.gen_range(MAP_PADDING..=MAP_HEIGHT - MAP_PADDING),
        rng.gen_range(-DEPTH_RANGE..=DEPTH_RANGE),
    )
}

fn is_clear(candidate: &Position, placed: &[Position]) -> bool {
    placed
        .iter()
        .all(|p| p.distance_2d(candidate) >= MIN_SEPARATION)
}

/// Pick a position for a new planet given the ones already placed.
pub fn place(placed: &[Position], rng: &mut impl Rng) -> Position {
    let mut candidate = sample(rng);
    let mut attempts = 1;
    while attempts < MAX_ATTEMPTS && !is_clear(&candidate, placed) {
        candidate = sample(rng);
        attempts += 1;
    }
    if !is_clear(&candidate, placed) {
        tracing::debug!(attempts, "placement cap exhausted, keeping crowded sample");
    }
    candidate
}

/// Re-scatter every planet of a freshly built galaxy.
pub fn scatter(planets: &mut [crate::model::Planet], rng: &mut impl Rng) {
    let mut placed: Vec<Position> = Vec::with_capacity(planets.len());
    for planet in planets.iter_mut() {
        let position = place(&placed, rng);
        planet.position = position;
        placed.push(position);
    }
}

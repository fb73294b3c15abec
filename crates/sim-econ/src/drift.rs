//! Periodic market drift: every planet's prices wander a little each tick.

use chrono::{DateTime, Utc};
use rand::Rng;
use sim_core::model::GameState;

/// Buy prices move by at most ±(DRIFT_SPREAD / 2) per tick.
pub const DRIFT_SPREAD: f64 = 0.1;
/// Sell prices land in this fraction band of the drifted buy price. The
/// upper bound is open, but rounding can still push a sell price into
/// parity with its buy price; that historical looseness is kept on purpose.
pub const SELL_RATIO_MIN: f64 = 0.8;
pub const SELL_RATIO_MAX: f64 = 1.0;

/// Perturb every market entry of every planet, returning a new snapshot.
/// Prices never drop below 1.
pub fn drift_market_prices(
    state: &GameState,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> GameState {
    let mut next = state.clone();
    for planet in &mut next.galaxy.planets {
        for market_entry in &mut planet.market {
            let fluctuation = (rng.gen::<f64>() - 0.5) * DRIFT_SPREAD;
            let buy = (f64::from(market_entry.buy_price) * (1.0 + fluctuation))
                .round()
                .max(1.0) as u32;
            market_entry.buy_price = buy;
            let ratio = rng.gen_range(SELL_RATIO_MIN..SELL_RATIO_MAX);
            market_entry.sell_price = (f64::from(buy) * ratio).round().max(1.0) as u32;
        }
    }
    next.last_updated = now;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::catalog;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_state() -> GameState {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        catalog::new_game_state(fixed_now(), &mut rng)
    }

    #[test]
    fn drift_is_seeded_and_reproducible() {
        let state = sample_state();
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        let drifted_a = drift_market_prices(&state, fixed_now(), &mut a);
        let drifted_b = drift_market_prices(&state, fixed_now(), &mut b);
        assert_eq!(drifted_a.galaxy, drifted_b.galaxy);
        // Input snapshot untouched.
        assert_eq!(state.galaxy, sample_state().galaxy);
    }

    #[test]
    fn drift_stamps_last_updated() {
        let state = sample_state();
        let later = fixed_now() + chrono::Duration::seconds(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let drifted = drift_market_prices(&state, later, &mut rng);
        assert_eq!(drifted.last_updated, later);
    }

    proptest! {
        // Prices stay positive and sell never exceeds buy across seeds.
        #[test]
        fn drifted_prices_stay_sane(seed in 0u64..300) {
            let state = sample_state();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let drifted = drift_market_prices(&state, fixed_now(), &mut rng);
            for planet in &drifted.galaxy.planets {
                for market_entry in &planet.market {
                    prop_assert!(market_entry.buy_price >= 1);
                    prop_assert!(market_entry.sell_price >= 1);
                    prop_assert!(market_entry.sell_price <= market_entry.buy_price);
                }
            }
        }

        // A single drift moves a buy price by at most ~5% (plus rounding).
        #[test]
        fn drift_is_bounded(seed in 0u64..300) {
            let state = sample_state();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let drifted = drift_market_prices(&state, fixed_now(), &mut rng);
            for (before, after) in state
                .galaxy
                .planets
                .iter()
                .zip(&drifted.galaxy.planets)
            {
                for (e0, e1) in before.market.iter().zip(&after.market) {
                    let low = (f64::from(e0.buy_price) * 0.95).floor() as u32;
                    let high = (f64::from(e0.buy_price) * 1.05).ceil() as u32;
                    prop_assert!(e1.buy_price >= low.max(1));
                    prop_assert!(e1.buy_price <= high);
                }
            }
        }
    }
}

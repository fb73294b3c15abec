//! Market generation service seam.
//!
//! Planet creation and editing delegate price-table generation to an
//! external async service. The trait below is that seam; responses are
//! validated here so a malformed table can never reach a committed
//! snapshot. [`BasePriceMarketSource`] is a deterministic local
//! implementation used when no external service is wired in.

use crate::admin::PlanetDraft;
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim_core::model::{Good, GoodId, MarketEntry};
use std::collections::BTreeSet;
use thiserror::Error;

/// Classified failures of market generation. All surface as a single
/// user-facing error at the planet-CRUD call site; nothing is committed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MarketGenError {
    #[error("market service failed: {0}")]
    Service(String),
    #[error("generated market is missing an entry for '{0}'")]
    MissingGood(GoodId),
    #[error("generated market has an unknown or duplicate entry for '{0}'")]
    UnexpectedEntry(GoodId),
    #[error("generated prices for '{0}' are invalid")]
    InvalidPrices(GoodId),
}

/// Async producer of a full price table for a planet draft.
///
/// Contract: exactly one entry per catalog good, positive integer prices,
/// and `sell_price <= buy_price` on every entry.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn generate(
        &self,
        draft: &PlanetDraft,
        goods: &[Good],
    ) -> Result<Vec<MarketEntry>, MarketGenError>;
}

/// Check a generated table against the service contract.
pub fn validate_market(entries: &[MarketEntry], goods: &[Good]) -> Result<(), MarketGenError> {
    let mut seen: BTreeSet<&GoodId> = BTreeSet::new();
    for market_entry in entries {
        let known = goods.iter().any(|g| g.id == market_entry.good_id);
        if !known || !seen.insert(&market_entry.good_id) {
            return Err(MarketGenError::UnexpectedEntry(market_entry.good_id.clone()));
        }
        if market_entry.buy_price == 0
            || market_entry.sell_price == 0
            || market_entry.sell_price > market_entry.buy_price
        {
            return Err(MarketGenError::InvalidPrices(market_entry.good_id.clone()));
        }
    }
    for good in goods {
        if !seen.contains(&good.id) {
            return Err(MarketGenError::MissingGood(good.id.clone()));
        }
    }
    Ok(())
}

/// SplitMix-style mixing for a stable per-draft stream.
fn mix_seed(seed: u64, name: &str) -> u64 {
    let mut h = seed;
    for b in name.bytes() {
        h = h.wrapping_add(u64::from(b)).wrapping_mul(0xbf58476d1ce4e5b9);
    }
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d049bb133111eb);
    h ^ (h >> 31)
}

/// Rule-based local market generator.
///
/// Mirrors the pricing rules the external service is asked to follow: one
/// specialty good priced at 50–70% of base, everything else scattered
/// around base price, sell at 85–95% of buy. Deterministic for a given
/// (seed, planet name) pair.
pub struct BasePriceMarketSource {
    seed: u64,
}

impl BasePriceMarketSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl MarketSource for BasePriceMarketSource {
    async fn generate(
        &self,
        draft: &PlanetDraft,
        goods: &[Good],
    ) -> Result<Vec<MarketEntry>, MarketGenError> {
        if goods.is_empty() {
            return Err(MarketGenError::Service("empty goods catalog".to_string()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(mix_seed(self.seed, &draft.name));
        let specialty = rng.gen_range(0..goods.len());

        let entries = goods
            .iter()
            .enumerate()
            .map(|(i, good)| {
                let base = f64::from(good.base_price);
                let buy = if i == specialty {
                    base * rng.gen_range(0.5..0.7)
                } else {
                    base * rng.gen_range(0.85..1.25)
                };
                let buy = buy.round().max(1.0) as u32;
                let sell = (f64::from(buy) * rng.gen_range(0.85..0.95))
                    .round()
                    .max(1.0) as u32;
                MarketEntry {
                    good_id: good.id.clone(),
                    buy_price: buy,
                    sell_price: sell.min(buy),
                }
            })
            .collect::<Vec<_>>();

        validate_market(&entries, goods)?;
        Ok(entries)
    }
}

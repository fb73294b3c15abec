#![deny(warnings)]

//! Market economics for Galaxy Trader: periodic price drift, the market
//! generation service seam, and planet administration.

pub mod admin;
pub mod drift;
pub mod source;

pub use admin::{PlanetAdminError, PlanetDraft};
pub use drift::drift_market_prices;
pub use source::{BasePriceMarketSource, MarketGenError, MarketSource};

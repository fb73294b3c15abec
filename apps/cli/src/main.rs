#![deny(warnings)]

//! Headless CLI: load or create a world, run the simulation timers for a
//! while, optionally fly an AutoBot mission, and print a summary.

use anyhow::Result;
use chrono::Utc;
use persistence::{FileStore, MemoryStore, SaveStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_ai::MissionConfig;
use sim_core::model::{GameState, GoodId, PlanetId};
use sim_econ::BasePriceMarketSource;
use sim_runtime::{Engine, RuntimeConfig, TracingSink};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    save: Option<String>,
    seed: u64,
    run_secs: u64,
    autobot: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        save: None,
        seed: 42,
        run_secs: 30,
        autobot: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--save" => args.save = it.next(),
            "--seed" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.seed = v;
                }
            }
            "--run-secs" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.run_secs = v;
                }
            }
            "--autobot" => args.autobot = it.next(),
            _ => {}
        }
    }
    args
}

/// Parse "good=water,dest=aqua,qty=10,mins=5".
fn parse_mission(spec: &str) -> Option<MissionConfig> {
    let mut good_id = None;
    let mut destination = None;
    let mut trade_quantity = 10u32;
    let mut duration_minutes = 5i64;
    for part in spec.split(',') {
        let (key, value) = part.split_once('=')?;
        match key {
            "good" => good_id = Some(GoodId::new(value)),
            "dest" => destination = Some(PlanetId::new(value)),
            "qty" => trade_quantity = value.parse().ok()?,
            "mins" => duration_minutes = value.parse().ok()?,
            _ => return None,
        }
    }
    Some(MissionConfig {
        good_id: good_id?,
        trade_quantity,
        destination: destination?,
        duration_minutes,
    })
}

fn render_price_table(state: &GameState) -> String {
    let mut out = String::new();
    for planet in &state.galaxy.planets {
        out.push_str(&format!(
            "{} (tax {:.0}%)\n",
            planet.name,
            planet.tax_rate * 100.0
        ));
        for good in &state.galaxy.goods {
            if let Some(entry) = planet.market_entry(&good.id) {
                out.push_str(&format!(
                    "  {:<16} buy {:>4}  sell {:>4}\n",
                    good.name, entry.buy_price, entry.sell_price
                ));
            }
        }
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(seed = args.seed, run_secs = args.run_secs, "starting galaxy trader");

    let store: Arc<dyn SaveStore> = match &args.save {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let loaded = persistence::load(store.as_ref(), Utc::now(), &mut rng)?;
    if loaded.is_new_game {
        info!("welcome to Galaxy Trader, a new journey begins");
    }
    print!("{}", render_price_table(&loaded.state));

    let config = RuntimeConfig {
        rng_seed: args.seed,
        ..RuntimeConfig::default()
    };
    let engine = Engine::new(
        loaded.state,
        config,
        store,
        Arc::new(TracingSink),
        Arc::new(BasePriceMarketSource::new(args.seed)),
    );
    engine.start();

    if let Some(spec) = &args.autobot {
        match parse_mission(spec) {
            Some(mission) => engine.start_autobot(&mission)?,
            None => anyhow::bail!("unparseable --autobot spec: {spec}"),
        }
    }

    tokio::time::sleep(std::time::Duration::from_secs(args.run_secs)).await;
    engine.shutdown();
    engine.save_game();

    let state = engine.snapshot();
    let location = state
        .current_planet()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "in transit".to_string());
    println!(
        "Credits: {} | Hull: {}/{} | Location: {}",
        state.player.credits,
        state.player.ship.durability,
        state.player.ship.max_durability,
        location
    );
    for item in &state.player.ship.cargo.items {
        println!(
            "Cargo: {} x{}",
            state.galaxy.good_name(&item.good_id),
            item.quantity
        );
    }

    Ok(())
}

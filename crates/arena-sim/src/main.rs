//! # Arena Sim
//!
//! Headless arena runner: loads a configuration, lets the bots fight for a
//! fixed number of ticks, and prints a JSON summary.
//!
//! Usage: `arena-sim [CONFIG_PATH] [TICKS]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod summary;

use anyhow::{Context, Result};
use arena_bots::{Arena, ArenaConfig, FixedClock, CONFIG_FILE};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::summary::{Summary, Tally};

/// Ticks run when none are given (one minute at 60 Hz).
const DEFAULT_TICKS: u64 = 3600;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("arena=info".parse()?))
        .init();

    info!("Arena sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let ticks = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid tick count: {raw}"))?,
        None => DEFAULT_TICKS,
    };

    let config = ArenaConfig::load_from(&config_path);
    let clock = FixedClock::new(config.fixed_dt);
    let dt = config.fixed_dt;

    let mut arena = Arena::from_config(config).context("failed to build arena")?;
    let tally = Tally::attach(&mut arena);
    arena.populate();

    for _ in 0..ticks {
        arena.step(&clock);
    }

    let summary = Summary::collect(&arena, &tally, ticks, dt);
    info!(
        deaths = summary.deaths,
        despawns = summary.despawns,
        "Arena sim finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

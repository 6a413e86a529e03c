#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Tile Defence headlessly.

mod config;
mod game;
mod render;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Result};
use clap::Parser;
use tile_defence_core::WELCOME_BANNER;

use crate::{
    config::SimulationConfig,
    game::{Game, Outcome},
};

/// Runs a tile defence simulation without a window.
#[derive(Debug, Parser)]
#[command(name = "tile-defence", version)]
struct Args {
    /// TOML scenario to play; the bundled scenario is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of ticks per round.
    #[arg(long, default_value_t = 6_000)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 20)]
    dt_ms: u64,
    /// Overrides the seed from the scenario file.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of rounds to play, restarting the board in between.
    #[arg(long, default_value_t = 1)]
    rounds: u32,
    /// Prints the board after every round.
    #[arg(long)]
    show_board: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Entry point for the Tile Defence command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    ensure!(args.dt_ms > 0, "--dt-ms must be positive");

    let config = SimulationConfig::load(args.config.as_deref())?;
    let seed = args.seed.unwrap_or(config.seed);
    let mut game = Game::new(&config, seed)?;
    let dt = Duration::from_millis(args.dt_ms);

    tracing::info!(
        seed,
        columns = config.board.columns,
        rows = config.board.rows,
        "{WELCOME_BANNER}"
    );

    for round in 0..args.rounds {
        if round > 0 {
            game.restart();
        }

        let mut outcome = Outcome::Running;
        let mut ticks = 0;
        while ticks < args.ticks && outcome == Outcome::Running {
            outcome = game.tick(dt);
            ticks += 1;
        }

        let tally = game.tally();
        tracing::info!(
            round,
            ?outcome,
            ticks,
            health = game.player_health(),
            cycle = game.scenario_progress().cycle(),
            wave = game.scenario_progress().wave_index(),
            spawned = tally.spawned,
            defeated = tally.defeated,
            leaked = tally.leaked,
            skipped_spawns = tally.rejected_spawns,
            "round over"
        );

        if args.show_board {
            println!("{}", render::render_board(game.board(), &game.enemy_view()));
            println!("{}", render::render_towers(game.board()));
            print!("{}", render::render_ordnance(game.ordnance()));
        }
    }

    Ok(())
}

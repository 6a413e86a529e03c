//! Tick driver wiring the board, enemies, towers and scenario together.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tile_defence_core::{Command, Event};
use tile_defence_system_enemies::{Enemies, EnemyFactories, EnemyView};
use tile_defence_system_scenario::{EnemyWave, GameScenario, ScenarioState};
use tile_defence_system_tower_combat::{Ordnance, Shell};
use tile_defence_system_tower_targeting::TargetAcquisition;
use tile_defence_world::{self as world, query, Board};

use crate::config::SimulationConfig;

const TARGETING_STREAM: u64 = 0x7461_7267_6574_696e;
const SPAWNING_STREAM: u64 = 0x7370_6177_6e69_6e67;

/// State of the match after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Running,
    Victory,
    Defeat,
}

/// Counters reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) spawned: u32,
    pub(crate) defeated: u32,
    pub(crate) leaked: u32,
    pub(crate) rejected_spawns: u32,
}

/// Single match: one board, its enemies and the scenario feeding them.
#[derive(Debug)]
pub(crate) struct Game {
    board: Board,
    layout: Vec<Command>,
    enemies: Enemies,
    factories: EnemyFactories,
    scenario: GameScenario,
    progress: ScenarioState,
    ordnance: Ordnance,
    acquisition: TargetAcquisition,
    spawn_rng: ChaCha8Rng,
    seed: u64,
    starting_health: u32,
    player_health: u32,
    play_speed: f32,
    tally: Tally,
    commands: Vec<Command>,
    events: Vec<Event>,
}

impl Game {
    /// Builds a match from the configuration, failing on invalid tuning or a
    /// layout edit the board refuses.
    pub(crate) fn new(config: &SimulationConfig, seed: u64) -> Result<Self> {
        let mut board = Board::with_tower_configs(
            config.board.columns,
            config.board.rows,
            config.laser,
            config.mortar,
        )
        .context("invalid board")?;

        let layout = config.layout_commands();
        let mut events = Vec::new();
        for command in &layout {
            events.clear();
            world::apply(&mut board, command.clone(), &mut events);
            if let Some(Event::ContentRejected { tile, reason, .. }) = events.first() {
                bail!("layout edit {command:?} on {tile:?} was refused: {reason}");
            }
        }

        let (factories, ids) = config.factories();
        let scenario = config.scenario(&ids)?;
        let cycle: Duration = scenario.waves().iter().map(EnemyWave::duration).sum();
        tracing::info!(
            waves = scenario.waves().len(),
            cycles = scenario.cycles(),
            cycle_speed_up = scenario.cycle_speed_up(),
            first_cycle = ?cycle,
            "scenario loaded"
        );

        Ok(Self {
            board,
            layout,
            enemies: Enemies::new(),
            factories,
            progress: scenario.begin(),
            scenario,
            ordnance: Ordnance::new(),
            acquisition: TargetAcquisition::new(seed ^ TARGETING_STREAM),
            spawn_rng: ChaCha8Rng::seed_from_u64(seed ^ SPAWNING_STREAM),
            seed,
            starting_health: config.player_health,
            player_health: config.player_health,
            play_speed: config.play_speed,
            tally: Tally::default(),
            commands: Vec::new(),
            events,
        })
    }

    /// Advances the match by `dt` scaled with the play speed.
    pub(crate) fn tick(&mut self, dt: Duration) -> Outcome {
        let outcome = self.outcome();
        if outcome != Outcome::Running {
            return outcome;
        }

        let dt = if self.play_speed == 1.0 {
            dt
        } else {
            dt.mul_f64(f64::from(self.play_speed))
        };
        let seconds = dt.as_secs_f32();
        self.commands.clear();
        self.events.clear();

        let _ = self.progress.progress(dt, &mut self.commands);
        self.route_spawns();

        self.enemies.game_update(seconds, &self.board, &mut self.events);

        self.commands.clear();
        self.board.game_update(
            seconds,
            &self.enemies,
            &mut self.acquisition,
            &mut self.commands,
        );
        for shell in self.commands.iter().filter_map(Shell::from_command) {
            self.ordnance.launch(shell);
        }
        self.ordnance.game_update(
            seconds,
            &self.enemies,
            &mut self.acquisition,
            &mut self.commands,
        );
        for command in self.commands.drain(..) {
            if let Command::ApplyDamage { enemy, amount } = command {
                let _ = self.enemies.apply_damage(enemy, amount);
            }
        }

        self.record_events();
        self.outcome()
    }

    fn route_spawns(&mut self) {
        let spawn_points = query::spawn_points(&self.board);
        for command in self.commands.drain(..) {
            let Command::SpawnEnemy { factory, kind } = command else {
                continue;
            };
            let Some(&tile) = spawn_points.choose(&mut self.spawn_rng) else {
                continue;
            };
            match self.enemies.spawn(
                &self.factories,
                factory,
                kind,
                tile,
                &self.board,
                &mut self.spawn_rng,
            ) {
                Ok(enemy) => self.events.push(Event::EnemySpawned { enemy, kind, tile }),
                Err(error) => {
                    self.tally.rejected_spawns += 1;
                    tracing::warn!(%error, "enemy spawn skipped");
                }
            }
        }
    }

    fn record_events(&mut self) {
        for event in &self.events {
            match event {
                Event::EnemySpawned { .. } => self.tally.spawned += 1,
                Event::EnemyDefeated { .. } => self.tally.defeated += 1,
                Event::EnemyReachedDestination { enemy } => {
                    self.tally.leaked += 1;
                    self.player_health = self.player_health.saturating_sub(1);
                    tracing::info!(
                        ?enemy,
                        health = self.player_health,
                        "enemy reached destination"
                    );
                }
                Event::ContentChanged { .. } | Event::ContentRejected { .. } => {}
            }
        }
    }

    /// Current result of the match.
    pub(crate) fn outcome(&self) -> Outcome {
        if self.player_health == 0 {
            Outcome::Defeat
        } else if self.progress.is_finished() && self.enemies.is_empty() {
            Outcome::Victory
        } else {
            Outcome::Running
        }
    }

    /// Returns the match to its configured starting state.
    pub(crate) fn restart(&mut self) {
        self.board.clear();
        for command in &self.layout {
            world::apply(&mut self.board, command.clone(), &mut self.events);
        }
        self.events.clear();
        self.commands.clear();
        self.enemies.clear();
        self.ordnance.clear();
        self.progress = self.scenario.begin();
        self.acquisition = TargetAcquisition::new(self.seed ^ TARGETING_STREAM);
        self.spawn_rng = ChaCha8Rng::seed_from_u64(self.seed ^ SPAWNING_STREAM);
        self.player_health = self.starting_health;
        self.tally = Tally::default();
    }

    pub(crate) const fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) const fn ordnance(&self) -> &Ordnance {
        &self.ordnance
    }

    pub(crate) fn enemy_view(&self) -> EnemyView {
        self.enemies.view()
    }

    pub(crate) const fn player_health(&self) -> u32 {
        self.player_health
    }

    pub(crate) const fn tally(&self) -> Tally {
        self.tally
    }

    pub(crate) const fn scenario_progress(&self) -> &ScenarioState {
        &self.progress
    }
}

//! Simulation settings loaded from TOML.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use tile_defence_core::{Command, EnemyFactoryId, EnemyKind, TileCoord, TowerKind};
use tile_defence_system_enemies::{EnemyFactories, EnemyFactory};
use tile_defence_system_scenario::{EnemySpawnSequence, EnemyWave, GameScenario};
use tile_defence_system_tower_combat::{LaserConfig, MortarConfig};

/// Scenario bundled with the binary, used when no `--config` is given.
pub(crate) const DEFAULT_CONFIG: &str = include_str!("../scenarios/default.toml");

/// Slowest running play speed; zero still pauses.
pub(crate) const MIN_PLAY_SPEED: f32 = 1.0;
/// Fastest supported play speed.
pub(crate) const MAX_PLAY_SPEED: f32 = 10.0;

/// Complete description of a simulation run.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    pub(crate) board: BoardConfig,
    #[serde(default)]
    pub(crate) seed: u64,
    #[serde(default = "default_player_health")]
    pub(crate) player_health: u32,
    /// Multiplier applied to every tick, clamped to `1..=10`; zero pauses the game.
    #[serde(default = "default_play_speed")]
    pub(crate) play_speed: f32,
    #[serde(default)]
    pub(crate) laser: LaserConfig,
    #[serde(default)]
    pub(crate) mortar: MortarConfig,
    pub(crate) factories: BTreeMap<String, EnemyFactory>,
    pub(crate) scenario: ScenarioConfig,
    #[serde(default)]
    pub(crate) layout: Vec<LayoutEdit>,
}

fn default_player_health() -> u32 {
    10
}

fn default_play_speed() -> f32 {
    1.0
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BoardConfig {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScenarioConfig {
    /// Zero repeats the scenario forever.
    #[serde(default = "default_cycles")]
    pub(crate) cycles: u32,
    #[serde(default)]
    pub(crate) cycle_speed_up: f32,
    pub(crate) waves: Vec<WaveConfig>,
}

fn default_cycles() -> u32 {
    1
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WaveConfig {
    pub(crate) sequences: Vec<SequenceConfig>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SequenceConfig {
    /// Name of an entry in the `factories` table.
    pub(crate) factory: String,
    pub(crate) kind: EnemyKind,
    pub(crate) amount: u32,
    pub(crate) cooldown_secs: f32,
}

/// Content placed on the board before the first tick.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LayoutEdit {
    pub(crate) content: LayoutContent,
    pub(crate) column: u32,
    pub(crate) row: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LayoutContent {
    Destination,
    Wall,
    SpawnPoint,
    Laser,
    Mortar,
}

impl LayoutEdit {
    /// Board command that toggles the edit's content onto its tile.
    pub(crate) fn command(self) -> Command {
        let tile = TileCoord::new(self.column, self.row);
        match self.content {
            LayoutContent::Destination => Command::ToggleDestination { tile },
            LayoutContent::Wall => Command::ToggleWall { tile },
            LayoutContent::SpawnPoint => Command::ToggleSpawnPoint { tile },
            LayoutContent::Laser => Command::ToggleTower {
                tile,
                kind: TowerKind::Laser,
            },
            LayoutContent::Mortar => Command::ToggleTower {
                tile,
                kind: TowerKind::Mortar,
            },
        }
    }
}

impl SimulationConfig {
    /// Reads the configuration at `path`, or the bundled default.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::parse(&contents)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            None => Self::parse(DEFAULT_CONFIG).context("invalid bundled config"),
        }
    }

    /// Parses and sanity checks TOML contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(contents).context("failed to parse simulation config toml")?;
        ensure!(
            config.play_speed.is_finite() && config.play_speed >= 0.0,
            "play_speed must be a non-negative number, got {}",
            config.play_speed
        );
        ensure!(config.player_health > 0, "player_health must be positive");
        if config.play_speed > 0.0 {
            config.play_speed = config.play_speed.clamp(MIN_PLAY_SPEED, MAX_PLAY_SPEED);
        }
        Ok(config)
    }

    /// Registers every configured factory, returning the registry and the
    /// identifier assigned to each factory name.
    pub(crate) fn factories(&self) -> (EnemyFactories, BTreeMap<String, EnemyFactoryId>) {
        let mut registry = EnemyFactories::new();
        let mut ids = BTreeMap::new();
        for (name, factory) in &self.factories {
            let _ = ids.insert(name.clone(), registry.register(*factory));
        }
        (registry, ids)
    }

    /// Builds the scenario, resolving factory names through `ids`.
    pub(crate) fn scenario(&self, ids: &BTreeMap<String, EnemyFactoryId>) -> Result<GameScenario> {
        let mut waves = Vec::with_capacity(self.scenario.waves.len());
        for (wave_index, wave) in self.scenario.waves.iter().enumerate() {
            let mut sequences = Vec::with_capacity(wave.sequences.len());
            for (sequence_index, sequence) in wave.sequences.iter().enumerate() {
                let built = sequence.build(ids).with_context(|| {
                    format!("invalid sequence {sequence_index} of wave {wave_index}")
                })?;
                sequences.push(built);
            }
            let wave =
                EnemyWave::new(sequences).with_context(|| format!("invalid wave {wave_index}"))?;
            waves.push(wave);
        }

        GameScenario::new(waves, self.scenario.cycles, self.scenario.cycle_speed_up)
            .context("invalid scenario")
    }

    /// Commands recreating the configured layout.
    pub(crate) fn layout_commands(&self) -> Vec<Command> {
        self.layout.iter().map(|edit| edit.command()).collect()
    }
}

impl SequenceConfig {
    fn build(&self, ids: &BTreeMap<String, EnemyFactoryId>) -> Result<EnemySpawnSequence> {
        let factory = *ids
            .get(&self.factory)
            .with_context(|| format!("unknown enemy factory `{}`", self.factory))?;
        let cooldown = Duration::try_from_secs_f32(self.cooldown_secs)
            .with_context(|| format!("cooldown_secs {} is not a duration", self.cooldown_secs))?;
        Ok(EnemySpawnSequence::new(factory, self.kind, self.amount, cooldown)?)
    }
}

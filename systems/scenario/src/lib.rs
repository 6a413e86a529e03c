#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic scenario scheduling responsible for emitting enemy spawn commands.
//!
//! A scenario is a list of waves, a wave is a list of spawn sequences and a
//! sequence spawns a fixed number of enemies at a fixed cadence. Each level
//! has an immutable definition and a `State` created by `begin`. Advancing a
//! state returns the time left over once the unit is exhausted so the caller
//! can forward it into the next sibling within the same tick, which keeps the
//! schedule independent of the tick granularity.

use std::{sync::Arc, time::Duration};

use tile_defence_core::{Command, EnemyFactoryId, EnemyKind};

/// Largest number of enemies a single sequence may spawn.
pub const MAX_SEQUENCE_AMOUNT: u32 = 100;

/// Shortest supported pause between spawns.
pub const MIN_SPAWN_COOLDOWN: Duration = Duration::from_millis(100);

/// Longest supported pause between spawns.
pub const MAX_SPAWN_COOLDOWN: Duration = Duration::from_secs(10);

/// Largest supported number of scenario cycles; zero repeats forever.
pub const MAX_CYCLES: u32 = 10;

/// Largest supported per-cycle time scale increase.
pub const MAX_CYCLE_SPEED_UP: f32 = 1.0;

/// Errors raised while assembling a scenario.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    /// A sequence would never spawn anything.
    #[error("spawn sequences must spawn at least one enemy")]
    ZeroAmount,
    /// A sequence has no pause between spawns.
    #[error("spawn sequences require a positive cooldown")]
    ZeroCooldown,
    /// A wave contains no sequences.
    #[error("waves require at least one spawn sequence")]
    EmptyWave,
    /// A scenario contains no waves.
    #[error("scenarios require at least one wave")]
    NoWaves,
    /// The per-cycle speed-up is negative or not a number.
    #[error("cycle speed-up must be a finite non-negative number, got {0}")]
    InvalidSpeedUp(f32),
}

/// Spawns `amount` enemies of one kind, one every `cooldown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnemySpawnSequence {
    factory: EnemyFactoryId,
    kind: EnemyKind,
    amount: u32,
    cooldown: Duration,
}

impl EnemySpawnSequence {
    /// Creates a sequence, clamping amount and cooldown into their supported
    /// ranges.
    pub fn new(
        factory: EnemyFactoryId,
        kind: EnemyKind,
        amount: u32,
        cooldown: Duration,
    ) -> Result<Self, ScenarioError> {
        if amount == 0 {
            return Err(ScenarioError::ZeroAmount);
        }
        if cooldown.is_zero() {
            return Err(ScenarioError::ZeroCooldown);
        }

        Ok(Self {
            factory,
            kind,
            amount: amount.min(MAX_SEQUENCE_AMOUNT),
            cooldown: cooldown.clamp(MIN_SPAWN_COOLDOWN, MAX_SPAWN_COOLDOWN),
        })
    }

    /// Factory that configures the spawned enemies.
    #[must_use]
    pub const fn factory(&self) -> EnemyFactoryId {
        self.factory
    }

    /// Kind of enemy spawned.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Number of enemies spawned over the sequence's lifetime.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Pause between consecutive spawns.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time needed to exhaust the sequence when starting from a fresh state.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.cooldown * self.amount
    }

    /// Starts a run of the sequence.
    ///
    /// The accumulator starts primed with a full cooldown, so the first enemy
    /// spawns on the very first update.
    #[must_use]
    pub const fn begin(self) -> SequenceState {
        SequenceState {
            sequence: self,
            count: 0,
            cooldown: self.cooldown,
        }
    }
}

/// Progress through a single [`EnemySpawnSequence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceState {
    sequence: EnemySpawnSequence,
    count: u32,
    cooldown: Duration,
}

impl SequenceState {
    /// Enemies spawned so far.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Advances the sequence, pushing one spawn command per elapsed cooldown.
    ///
    /// Returns `None` while the sequence still has enemies to spawn and the
    /// unconsumed time once it is exhausted.
    pub fn progress(&mut self, dt: Duration, out: &mut Vec<Command>) -> Option<Duration> {
        self.cooldown = self.cooldown.saturating_add(dt);
        while self.cooldown >= self.sequence.cooldown {
            self.cooldown -= self.sequence.cooldown;
            if self.count >= self.sequence.amount {
                return Some(self.cooldown);
            }
            self.count += 1;
            out.push(Command::SpawnEnemy {
                factory: self.sequence.factory,
                kind: self.sequence.kind,
            });
        }
        None
    }
}

/// Ordered list of sequences played back to back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnemyWave {
    sequences: Arc<[EnemySpawnSequence]>,
}

impl EnemyWave {
    /// Creates a wave from at least one sequence.
    pub fn new(sequences: Vec<EnemySpawnSequence>) -> Result<Self, ScenarioError> {
        if sequences.is_empty() {
            return Err(ScenarioError::EmptyWave);
        }
        Ok(Self {
            sequences: sequences.into(),
        })
    }

    /// Sequences in playback order.
    #[must_use]
    pub fn sequences(&self) -> &[EnemySpawnSequence] {
        &self.sequences
    }

    /// Time needed to play every sequence of the wave back to back.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.sequences.iter().map(EnemySpawnSequence::duration).sum()
    }

    /// Starts a run of the wave at its first sequence.
    #[must_use]
    pub fn begin(&self) -> WaveState {
        WaveState {
            sequences: Arc::clone(&self.sequences),
            index: 0,
            sequence: self.sequences[0].begin(),
        }
    }
}

/// Progress through an [`EnemyWave`].
#[derive(Clone, Debug)]
pub struct WaveState {
    sequences: Arc<[EnemySpawnSequence]>,
    index: usize,
    sequence: SequenceState,
}

impl WaveState {
    /// Index of the active sequence.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Advances the active sequence, rolling leftover time into the following
    /// ones. Returns the unconsumed time once the last sequence is exhausted.
    pub fn progress(&mut self, dt: Duration, out: &mut Vec<Command>) -> Option<Duration> {
        let mut leftover = self.sequence.progress(dt, out)?;
        loop {
            if self.index + 1 >= self.sequences.len() {
                return Some(leftover);
            }
            self.index += 1;
            self.sequence = self.sequences[self.index].begin();
            leftover = self.sequence.progress(leftover, out)?;
        }
    }
}

/// Waves played in order, optionally repeated with increasing speed.
#[derive(Clone, Debug, PartialEq)]
pub struct GameScenario {
    waves: Arc<[EnemyWave]>,
    cycles: u32,
    cycle_speed_up: f32,
}

impl GameScenario {
    /// Creates a scenario.
    ///
    /// `cycles` is clamped to [`MAX_CYCLES`] with zero meaning unlimited, and
    /// `cycle_speed_up` to [`MAX_CYCLE_SPEED_UP`].
    pub fn new(
        waves: Vec<EnemyWave>,
        cycles: u32,
        cycle_speed_up: f32,
    ) -> Result<Self, ScenarioError> {
        if waves.is_empty() {
            return Err(ScenarioError::NoWaves);
        }
        if !cycle_speed_up.is_finite() || cycle_speed_up < 0.0 {
            return Err(ScenarioError::InvalidSpeedUp(cycle_speed_up));
        }

        Ok(Self {
            waves: waves.into(),
            cycles: cycles.min(MAX_CYCLES),
            cycle_speed_up: cycle_speed_up.min(MAX_CYCLE_SPEED_UP),
        })
    }

    /// Waves in playback order.
    #[must_use]
    pub fn waves(&self) -> &[EnemyWave] {
        &self.waves
    }

    /// Number of cycles to play; zero repeats forever.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Time scale increase applied when a cycle wraps.
    #[must_use]
    pub const fn cycle_speed_up(&self) -> f32 {
        self.cycle_speed_up
    }

    /// Starts the scenario at its first wave with unit time scale.
    #[must_use]
    pub fn begin(&self) -> ScenarioState {
        ScenarioState {
            scenario: self.clone(),
            cycle: 0,
            wave_index: 0,
            time_scale: 1.0,
            wave: self.waves[0].begin(),
            finished: false,
        }
    }
}

/// Progress through a [`GameScenario`].
#[derive(Clone, Debug)]
pub struct ScenarioState {
    scenario: GameScenario,
    cycle: u32,
    wave_index: usize,
    time_scale: f32,
    wave: WaveState,
    finished: bool,
}

impl ScenarioState {
    /// Number of completed cycles.
    #[must_use]
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Index of the active wave.
    #[must_use]
    pub const fn wave_index(&self) -> usize {
        self.wave_index
    }

    /// Factor applied to elapsed time before it reaches the active wave.
    #[must_use]
    pub const fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Whether the configured number of cycles has been played.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advances the scenario by `dt` of unscaled time.
    ///
    /// Returns `false` once the last cycle completes and on every call after.
    pub fn progress(&mut self, dt: Duration, out: &mut Vec<Command>) -> bool {
        if self.finished {
            return false;
        }

        let scaled = if self.time_scale == 1.0 {
            dt
        } else {
            dt.mul_f64(f64::from(self.time_scale))
        };
        let Some(mut leftover) = self.wave.progress(scaled, out) else {
            return true;
        };

        loop {
            self.wave_index += 1;
            if self.wave_index >= self.scenario.waves.len() {
                self.cycle += 1;
                if self.scenario.cycles > 0 && self.cycle >= self.scenario.cycles {
                    tracing::debug!(cycle = self.cycle, "scenario finished");
                    self.finished = true;
                    return false;
                }
                self.wave_index = 0;
                self.time_scale += self.scenario.cycle_speed_up;
                tracing::debug!(
                    cycle = self.cycle,
                    time_scale = self.time_scale,
                    "scenario cycle wrapped"
                );
            }

            tracing::debug!(wave = self.wave_index, "wave started");
            self.wave = self.scenario.waves[self.wave_index].begin();
            match self.wave.progress(leftover, out) {
                Some(remaining) => leftover = remaining,
                None => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(amount: u32, cooldown_ms: u64) -> EnemySpawnSequence {
        EnemySpawnSequence::new(
            EnemyFactoryId::new(0),
            EnemyKind::Medium,
            amount,
            Duration::from_millis(cooldown_ms),
        )
        .expect("valid sequence")
    }

    #[test]
    fn sequence_tuning_is_clamped() {
        let clamped = sequence(500, 20);
        assert_eq!(clamped.amount(), MAX_SEQUENCE_AMOUNT);
        assert_eq!(clamped.cooldown(), MIN_SPAWN_COOLDOWN);

        let slow = sequence(1, 60_000);
        assert_eq!(slow.cooldown(), MAX_SPAWN_COOLDOWN);
    }

    #[test]
    fn degenerate_sequences_are_rejected() {
        let kind = EnemyKind::Small;
        let factory = EnemyFactoryId::new(1);
        assert_eq!(
            EnemySpawnSequence::new(factory, kind, 0, Duration::from_secs(1)),
            Err(ScenarioError::ZeroAmount)
        );
        assert_eq!(
            EnemySpawnSequence::new(factory, kind, 3, Duration::ZERO),
            Err(ScenarioError::ZeroCooldown)
        );
    }

    #[test]
    fn first_spawn_is_immediate() {
        let mut state = sequence(2, 1_000).begin();
        let mut out = Vec::new();

        assert_eq!(state.progress(Duration::ZERO, &mut out), None);
        assert_eq!(out.len(), 1, "primed cooldown spawns right away");
        assert_eq!(state.count(), 1);
    }

    #[test]
    fn wave_forwards_leftover_into_next_sequence() {
        let wave = EnemyWave::new(vec![sequence(1, 1_000), sequence(2, 500)]).expect("valid");
        let mut state = wave.begin();
        let mut out = Vec::new();

        assert_eq!(state.progress(Duration::from_millis(1_250), &mut out), None);
        assert_eq!(state.index(), 1);
        assert_eq!(out.len(), 2, "one enemy from each sequence");
    }

    #[test]
    fn sequence_is_exhausted_exactly_after_its_duration() {
        let spawner = sequence(3, 700);
        assert_eq!(spawner.duration(), Duration::from_millis(2_100));

        let mut state = spawner.begin();
        let mut out = Vec::new();
        let almost = spawner.duration() - Duration::from_nanos(1);
        assert_eq!(state.progress(almost, &mut out), None);
        assert_eq!(out.len(), 3);
        assert_eq!(
            state.progress(Duration::from_nanos(1), &mut out),
            Some(Duration::ZERO)
        );

        let wave = EnemyWave::new(vec![spawner, sequence(2, 500)]).expect("valid");
        assert_eq!(wave.duration(), Duration::from_millis(3_100));
    }

    #[test]
    fn unit_time_scale_counts_whole_cooldowns_exactly() {
        let wave = EnemyWave::new(vec![sequence(3, 700)]).expect("valid");
        let scenario = GameScenario::new(vec![wave], 1, 0.0).expect("valid");
        let mut state = scenario.begin();
        let mut out = Vec::new();

        assert!(state.progress(Duration::from_millis(700), &mut out));
        assert_eq!(
            out.len(),
            2,
            "the primed spawn plus one full 700 ms cooldown, got {out:?}"
        );
    }

    #[test]
    fn wrapping_a_cycle_speeds_up_time() {
        let wave = EnemyWave::new(vec![sequence(1, 1_000)]).expect("valid");
        let scenario = GameScenario::new(vec![wave], 0, 0.5).expect("valid");
        assert_eq!(scenario.cycle_speed_up(), 0.5);
        let mut state = scenario.begin();
        let mut out = Vec::new();

        assert!(state.progress(Duration::from_millis(1_000), &mut out));
        assert_eq!(state.cycle(), 1);
        assert_eq!(state.time_scale(), 1.5);

        out.clear();
        assert!(state.progress(Duration::from_millis(700), &mut out));
        assert_eq!(state.cycle(), 2, "1.05 s of scaled time exhausts the wave again");
        assert!(!state.is_finished(), "zero cycles repeat forever");
    }

    #[test]
    fn speed_up_is_capped() {
        let wave = EnemyWave::new(vec![sequence(1, 1_000)]).expect("valid");
        let scenario = GameScenario::new(vec![wave], 3, 4.0).expect("valid");
        assert_eq!(scenario.cycle_speed_up(), MAX_CYCLE_SPEED_UP);
        assert_eq!(scenario.cycles(), 3);
    }

    #[test]
    fn empty_wave_and_scenario_are_rejected() {
        assert_eq!(EnemyWave::new(Vec::new()), Err(ScenarioError::EmptyWave));
        assert_eq!(
            GameScenario::new(Vec::new(), 1, 0.0),
            Err(ScenarioError::NoWaves)
        );
    }

    #[test]
    fn negative_speed_up_is_rejected() {
        let wave = EnemyWave::new(vec![sequence(1, 1_000)]).expect("valid");
        assert_eq!(
            GameScenario::new(vec![wave], 1, -0.5),
            Err(ScenarioError::InvalidSpeedUp(-0.5))
        );
    }
}

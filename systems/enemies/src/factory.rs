//! Randomised enemy tuning per size class.

use rand::Rng;
use serde::Deserialize;
use tile_defence_core::{EnemyFactoryId, EnemyKind, FloatRange};

/// Errors raised while validating enemy tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    /// A tuning range contained NaN or infinite bounds.
    #[error("enemy parameter `{field}` of {kind:?} enemies must be finite")]
    NonFinite {
        /// Size class being configured.
        kind: EnemyKind,
        /// Name of the offending parameter.
        field: &'static str,
    },
}

/// Value ranges a single enemy kind is rolled from.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Visual and collider scale, clamped to `0.5..=2`.
    pub scale: FloatRange,
    /// Walking speed in tiles per second, clamped to `0.2..=5`.
    pub speed: FloatRange,
    /// Sideways offset from the path center, clamped to `-0.4..=0.4`.
    pub path_offset: FloatRange,
    /// Starting health, clamped to `10..=1000`.
    pub health: FloatRange,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            scale: FloatRange::constant(1.0),
            speed: FloatRange::constant(1.0),
            path_offset: FloatRange::constant(0.0),
            health: FloatRange::constant(100.0),
        }
    }
}

impl EnemyConfig {
    fn clamped(self, kind: EnemyKind) -> Result<Self, FactoryError> {
        let check = |field: &'static str, range: FloatRange, lower: f32, upper: f32| {
            if range.is_finite() {
                Ok(range.clamped(lower, upper))
            } else {
                Err(FactoryError::NonFinite { kind, field })
            }
        };

        Ok(Self {
            scale: check("scale", self.scale, 0.5, 2.0)?,
            speed: check("speed", self.speed, 0.2, 5.0)?,
            path_offset: check("path_offset", self.path_offset, -0.4, 0.4)?,
            health: check("health", self.health, 10.0, 1000.0)?,
        })
    }
}

/// Concrete values rolled for one enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyTraits {
    /// Visual and collider scale.
    pub scale: f32,
    /// Walking speed in tiles per second.
    pub speed: f32,
    /// Sideways offset from the path center.
    pub path_offset: f32,
    /// Starting health.
    pub health: f32,
}

/// Per-kind tuning used to roll new enemies.
///
/// Deserialised factories go through the same clamping as [`EnemyFactory::new`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawEnemyFactory")]
pub struct EnemyFactory {
    small: EnemyConfig,
    medium: EnemyConfig,
    large: EnemyConfig,
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawEnemyFactory {
    small: EnemyConfig,
    medium: EnemyConfig,
    large: EnemyConfig,
}

impl TryFrom<RawEnemyFactory> for EnemyFactory {
    type Error = FactoryError;

    fn try_from(raw: RawEnemyFactory) -> Result<Self, Self::Error> {
        Self::new(raw.small, raw.medium, raw.large)
    }
}

impl EnemyFactory {
    /// Creates a factory, clamping every range into its supported interval.
    pub fn new(
        small: EnemyConfig,
        medium: EnemyConfig,
        large: EnemyConfig,
    ) -> Result<Self, FactoryError> {
        Self {
            small,
            medium,
            large,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, FactoryError> {
        Ok(Self {
            small: self.small.clamped(EnemyKind::Small)?,
            medium: self.medium.clamped(EnemyKind::Medium)?,
            large: self.large.clamped(EnemyKind::Large)?,
        })
    }

    /// Tuning of the requested kind.
    #[must_use]
    pub const fn config(&self, kind: EnemyKind) -> &EnemyConfig {
        match kind {
            EnemyKind::Small => &self.small,
            EnemyKind::Medium => &self.medium,
            EnemyKind::Large => &self.large,
        }
    }

    /// Rolls the traits of a new enemy of the requested kind.
    pub fn roll<R: Rng + ?Sized>(&self, kind: EnemyKind, rng: &mut R) -> EnemyTraits {
        let config = self.config(kind);
        EnemyTraits {
            scale: config.scale.random_value_in_range(rng),
            speed: config.speed.random_value_in_range(rng),
            path_offset: config.path_offset.random_value_in_range(rng),
            health: config.health.random_value_in_range(rng),
        }
    }
}

/// Registry of factories addressed by [`EnemyFactoryId`].
#[derive(Clone, Debug, Default)]
pub struct EnemyFactories {
    entries: Vec<EnemyFactory>,
}

impl EnemyFactories {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a factory and returns its identifier.
    pub fn register(&mut self, factory: EnemyFactory) -> EnemyFactoryId {
        let id = EnemyFactoryId::new(self.entries.len() as u32);
        self.entries.push(factory);
        id
    }

    /// Factory registered under `id`.
    #[must_use]
    pub fn get(&self, id: EnemyFactoryId) -> Option<&EnemyFactory> {
        self.entries.get(id.get() as usize)
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

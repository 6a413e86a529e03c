use glam::Vec3;
use serde::Deserialize;
use tile_defence_core::{Command, TargetField, TargetPoint};
use tile_defence_system_tower_targeting::track_target;

use crate::{ensure_finite, TowerConfigError, TowerContext};

/// Tuning for continuous-beam towers.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LaserConfig {
    /// Radius of the overlap query, clamped to `1.5..=10.5`.
    pub targeting_range: f32,
    /// Damage dealt per second of beam contact, clamped to `1..=100`.
    pub damage_per_second: f32,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            targeting_range: 1.5,
            damage_per_second: 10.0,
        }
    }
}

impl LaserConfig {
    /// Clamps every value into its supported range, rejecting non-finite input.
    pub fn clamped(self) -> Result<Self, TowerConfigError> {
        Ok(Self {
            targeting_range: ensure_finite("targeting_range", self.targeting_range)?
                .clamp(1.5, 10.5),
            damage_per_second: ensure_finite("damage_per_second", self.damage_per_second)?
                .clamp(1.0, 100.0),
        })
    }
}

/// Visible beam from the tower to its locked target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaserBeam {
    /// Beam origin at the tower.
    pub origin: Vec3,
    /// Beam end at the target.
    pub end: Vec3,
}

impl LaserBeam {
    /// Length of the beam.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.origin.distance(self.end)
    }
}

/// Tower that damages its target continuously while the lock holds.
#[derive(Clone, Debug)]
pub struct LaserTower {
    targeting_range: f32,
    damage_per_second: f32,
    target: Option<TargetPoint>,
    beam: Option<LaserBeam>,
}

impl LaserTower {
    /// Creates an idle laser from clamped tuning.
    pub fn new(config: LaserConfig) -> Result<Self, TowerConfigError> {
        let config = config.clamped()?;
        Ok(Self {
            targeting_range: config.targeting_range,
            damage_per_second: config.damage_per_second,
            target: None,
            beam: None,
        })
    }

    /// Radius of the overlap query.
    #[must_use]
    pub const fn targeting_range(&self) -> f32 {
        self.targeting_range
    }

    /// Damage dealt per second of contact.
    #[must_use]
    pub const fn damage_per_second(&self) -> f32 {
        self.damage_per_second
    }

    /// Currently locked target.
    #[must_use]
    pub const fn target(&self) -> Option<TargetPoint> {
        self.target
    }

    /// Beam drawn this tick, if the laser fired.
    #[must_use]
    pub const fn beam(&self) -> Option<LaserBeam> {
        self.beam
    }

    pub(crate) fn game_update<F>(
        &mut self,
        context: &mut TowerContext<'_, F>,
        out: &mut Vec<Command>,
    ) where
        F: TargetField + ?Sized,
    {
        let field = context.field;
        let locked = track_target(field, context.position, self.targeting_range, &mut self.target)
            || {
                self.target = context.acquisition.acquire_target(
                    field,
                    context.position,
                    self.targeting_range,
                );
                self.target.is_some()
            };

        if !locked {
            self.beam = None;
            return;
        }

        self.shoot(context.dt, context.position, field, out);
    }

    fn shoot<F>(&mut self, dt: f32, position: Vec3, field: &F, out: &mut Vec<Command>)
    where
        F: TargetField + ?Sized,
    {
        let Some(target) = self.target else {
            self.beam = None;
            return;
        };
        let Some(sample) = field.resolve(target) else {
            self.target = None;
            self.beam = None;
            return;
        };

        self.beam = Some(LaserBeam {
            origin: position,
            end: sample.position,
        });
        out.push(Command::ApplyDamage {
            enemy: target.enemy(),
            amount: self.damage_per_second * dt,
        });
    }
}

use glam::Vec3;
use serde::Deserialize;
use tile_defence_core::{Command, TargetField, TargetPoint};

use crate::{ensure_finite, TowerConfigError, TowerContext, GRAVITY};

/// Distance past the targeting range that shells must still be able to reach.
pub const REACH_ALLOWANCE: f32 = 0.25;

const DERIVATION_SLACK: f32 = 0.000_01;
const HOLD_PROGRESS: f32 = 0.999;
const VERTICAL_SHOT_DISTANCE: f64 = 1e-6;

/// Tuning for ballistic towers.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MortarConfig {
    /// Radius of the overlap query, clamped to `1.5..=10.5`.
    pub targeting_range: f32,
    /// Launch rate, clamped to `0.5..=2`.
    pub shots_per_second: f32,
    /// Explosion radius, clamped to `0.5..=3`.
    pub blast_radius: f32,
    /// Damage dealt to every enemy inside the blast, clamped to `1..=100`.
    pub shell_damage: f32,
    /// Height above the tile that shells leave from.
    pub mount_height: f32,
    /// Fixed launch speed; derived from range and mount height when absent.
    pub launch_speed: Option<f32>,
}

impl Default for MortarConfig {
    fn default() -> Self {
        Self {
            targeting_range: 3.5,
            shots_per_second: 1.0,
            blast_radius: 1.0,
            shell_damage: 10.0,
            mount_height: 1.25,
            launch_speed: None,
        }
    }
}

impl MortarConfig {
    /// Clamps every value into its supported range, rejecting non-finite or
    /// negative input where clamping would hide a mistake.
    pub fn clamped(self) -> Result<Self, TowerConfigError> {
        let mount_height = ensure_finite("mount_height", self.mount_height)?;
        if mount_height < 0.0 {
            return Err(TowerConfigError::Negative {
                field: "mount_height",
                value: mount_height,
            });
        }
        let launch_speed = match self.launch_speed {
            Some(speed) => {
                let speed = ensure_finite("launch_speed", speed)?;
                if speed < 0.0 {
                    return Err(TowerConfigError::Negative {
                        field: "launch_speed",
                        value: speed,
                    });
                }
                Some(speed)
            }
            None => None,
        };

        Ok(Self {
            targeting_range: ensure_finite("targeting_range", self.targeting_range)?
                .clamp(1.5, 10.5),
            shots_per_second: ensure_finite("shots_per_second", self.shots_per_second)?
                .clamp(0.5, 2.0),
            blast_radius: ensure_finite("blast_radius", self.blast_radius)?.clamp(0.5, 3.0),
            shell_damage: ensure_finite("shell_damage", self.shell_damage)?.clamp(1.0, 100.0),
            mount_height,
            launch_speed,
        })
    }
}

/// Failure to find a firing solution for a shell.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum BallisticsError {
    /// The launch speed is too low to reach the target.
    #[error("launch speed {speed} cannot reach a target {distance} units away")]
    InsufficientSpeed {
        /// Horizontal distance to the target.
        distance: f32,
        /// Launch speed that was tried.
        speed: f32,
    },
}

/// Smallest launch speed that reaches `range` plus the reach allowance when
/// fired from `mount_height` above the ground.
#[must_use]
pub fn launch_speed_for(range: f32, mount_height: f32) -> f32 {
    let x = f64::from(range + REACH_ALLOWANCE + DERIVATION_SLACK);
    let y = -f64::from(mount_height);
    let g = f64::from(GRAVITY);
    (g * (y + x.hypot(y))).sqrt() as f32
}

fn discriminant(x: f64, y: f64, speed: f64) -> f64 {
    let g = f64::from(GRAVITY);
    let s2 = speed * speed;
    s2 * s2 - g * (g * x * x + 2.0 * y * s2)
}

/// Solves the high-arc launch velocity that carries a shell from
/// `launch_point` to `target_point` at the given speed.
pub fn solve_launch(
    launch_point: Vec3,
    target_point: Vec3,
    speed: f32,
) -> Result<Vec3, BallisticsError> {
    let dx = f64::from(target_point.x - launch_point.x);
    let dz = f64::from(target_point.z - launch_point.z);
    let x = dx.hypot(dz);
    let y = f64::from(target_point.y - launch_point.y);
    let s = f64::from(speed);

    let r = discriminant(x, y, s);
    if r < 0.0 {
        return Err(BallisticsError::InsufficientSpeed {
            distance: x as f32,
            speed,
        });
    }

    if x < VERTICAL_SHOT_DISTANCE {
        return Ok(Vec3::Y * speed);
    }

    let tan_theta = (s * s + r.sqrt()) / (f64::from(GRAVITY) * x);
    let cos_theta = tan_theta.atan().cos();
    let sin_theta = cos_theta * tan_theta;
    let horizontal = s * cos_theta;

    Ok(Vec3::new(
        (horizontal * dx / x) as f32,
        (s * sin_theta) as f32,
        (horizontal * dz / x) as f32,
    ))
}

/// Tower that lobs shells at a random enemy within range.
#[derive(Clone, Debug)]
pub struct MortarTower {
    targeting_range: f32,
    shots_per_second: f32,
    blast_radius: f32,
    shell_damage: f32,
    mount_height: f32,
    launch_speed: f32,
    launch_progress: f32,
    target: Option<TargetPoint>,
}

impl MortarTower {
    /// Creates an idle mortar, deriving the launch speed when none is given.
    ///
    /// Fails with [`TowerConfigError::UnreachableRange`] when the launch speed
    /// cannot carry a shell to the edge of the targeting range.
    pub fn new(config: MortarConfig) -> Result<Self, TowerConfigError> {
        let config = config.clamped()?;
        let launch_speed = config
            .launch_speed
            .unwrap_or_else(|| launch_speed_for(config.targeting_range, config.mount_height));

        let reach = f64::from(config.targeting_range + REACH_ALLOWANCE);
        if !launch_speed.is_finite()
            || discriminant(reach, -f64::from(config.mount_height), f64::from(launch_speed)) < 0.0
        {
            return Err(TowerConfigError::UnreachableRange {
                range: config.targeting_range,
                mount_height: config.mount_height,
                launch_speed,
            });
        }

        Ok(Self {
            targeting_range: config.targeting_range,
            shots_per_second: config.shots_per_second,
            blast_radius: config.blast_radius,
            shell_damage: config.shell_damage,
            mount_height: config.mount_height,
            launch_speed,
            launch_progress: 0.0,
            target: None,
        })
    }

    /// Radius of the overlap query.
    #[must_use]
    pub const fn targeting_range(&self) -> f32 {
        self.targeting_range
    }

    /// Speed every shell leaves the barrel with.
    #[must_use]
    pub const fn launch_speed(&self) -> f32 {
        self.launch_speed
    }

    /// Accumulated fraction of the next shot.
    #[must_use]
    pub const fn launch_progress(&self) -> f32 {
        self.launch_progress
    }

    /// Explosion radius of launched shells.
    #[must_use]
    pub const fn blast_radius(&self) -> f32 {
        self.blast_radius
    }

    /// Target of the most recent launch, cleared when nothing is in range.
    #[must_use]
    pub const fn target(&self) -> Option<TargetPoint> {
        self.target
    }

    pub(crate) fn game_update<F>(
        &mut self,
        context: &mut TowerContext<'_, F>,
        out: &mut Vec<Command>,
    ) where
        F: TargetField + ?Sized,
    {
        let field = context.field;
        self.launch_progress += self.shots_per_second * context.dt;

        while self.launch_progress >= 1.0 {
            let sample = context
                .acquisition
                .acquire_target(field, context.position, self.targeting_range)
                .and_then(|target| field.resolve(target).map(|sample| (target, sample)));

            let Some((target, sample)) = sample else {
                self.target = None;
                self.launch_progress = HOLD_PROGRESS;
                break;
            };

            self.target = Some(target);
            self.launch(context.position, sample.position, out);
            self.launch_progress -= 1.0;
        }
    }

    fn launch(&self, position: Vec3, target_position: Vec3, out: &mut Vec<Command>) {
        let launch_point = position + Vec3::Y * self.mount_height;
        let target_point = Vec3::new(target_position.x, 0.0, target_position.z);

        match solve_launch(launch_point, target_point, self.launch_speed) {
            Ok(velocity) => out.push(Command::LaunchShell {
                launch_point,
                target_point,
                velocity,
                blast_radius: self.blast_radius,
                damage: self.shell_damage,
            }),
            Err(error) => tracing::error!(%error, "mortar shot skipped"),
        }
    }
}

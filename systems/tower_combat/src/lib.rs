#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tower attack state machines and the ordnance they release.
//!
//! Every tower runs the same targeting loop each tick: keep the locked target
//! if it can still be tracked, otherwise try to acquire a new one, and fire
//! when either succeeds. Towers only differ in how they deliver damage. The
//! laser emits [`Command::ApplyDamage`] scaled by the elapsed time, the mortar
//! emits [`Command::LaunchShell`] with a solved ballistic velocity that the
//! driver hands to [`Ordnance`].

use glam::Vec3;
use tile_defence_core::{Command, TargetField, TargetPoint, TowerKind};
use tile_defence_system_tower_targeting::TargetAcquisition;

mod laser;
mod mortar;
mod ordnance;

pub use laser::{LaserBeam, LaserConfig, LaserTower};
pub use mortar::{
    launch_speed_for, solve_launch, BallisticsError, MortarConfig, MortarTower, REACH_ALLOWANCE,
};
pub use ordnance::{Explosion, Ordnance, Shell, EXPLOSION_DURATION};

/// Gravitational acceleration applied to shells, in units per second squared.
pub const GRAVITY: f32 = 9.81;

/// Errors raised while validating tower tuning.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum TowerConfigError {
    /// A tuning value was NaN or infinite.
    #[error("tower parameter `{field}` must be a finite number")]
    NonFinite {
        /// Name of the offending parameter.
        field: &'static str,
    },
    /// A tuning value that must not be negative was negative.
    #[error("tower parameter `{field}` must not be negative, got {value}")]
    Negative {
        /// Name of the offending parameter.
        field: &'static str,
        /// Value that was provided.
        value: f32,
    },
    /// The mortar cannot reach the edge of its targeting range.
    #[error(
        "launch speed {launch_speed} cannot reach range {range} from mount height {mount_height}"
    )]
    UnreachableRange {
        /// Configured targeting range.
        range: f32,
        /// Height the shells are launched from.
        mount_height: f32,
        /// Launch speed that was configured or derived.
        launch_speed: f32,
    },
}

pub(crate) fn ensure_finite(field: &'static str, value: f32) -> Result<f32, TowerConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TowerConfigError::NonFinite { field })
    }
}

/// Targeting status of a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TowerState {
    /// No target; the tower holds fire.
    Idle,
    /// A target is locked and the tower is firing.
    Tracking,
}

/// Per-tick inputs shared by every tower update.
pub struct TowerContext<'a, F: ?Sized> {
    /// Seconds elapsed since the previous update.
    pub dt: f32,
    /// World-space position of the tower's tile.
    pub position: Vec3,
    /// Field answering overlap and resolve queries.
    pub field: &'a F,
    /// Shared overlap buffer and random source.
    pub acquisition: &'a mut TargetAcquisition,
}

/// A placed tower and its attack-specific state.
#[derive(Clone, Debug)]
pub enum Tower {
    /// Continuous-beam tower.
    Laser(LaserTower),
    /// Ballistic tower.
    Mortar(MortarTower),
}

impl Tower {
    /// Kind of the tower.
    #[must_use]
    pub const fn kind(&self) -> TowerKind {
        match self {
            Self::Laser(_) => TowerKind::Laser,
            Self::Mortar(_) => TowerKind::Mortar,
        }
    }

    /// Radius of the tower's overlap query.
    #[must_use]
    pub fn targeting_range(&self) -> f32 {
        match self {
            Self::Laser(laser) => laser.targeting_range(),
            Self::Mortar(mortar) => mortar.targeting_range(),
        }
    }

    /// Current targeting status.
    #[must_use]
    pub fn state(&self) -> TowerState {
        if self.target().is_some() {
            TowerState::Tracking
        } else {
            TowerState::Idle
        }
    }

    /// Target the tower fired at most recently, if it is still engaged.
    #[must_use]
    pub fn target(&self) -> Option<TargetPoint> {
        match self {
            Self::Laser(laser) => laser.target(),
            Self::Mortar(mortar) => mortar.target(),
        }
    }

    /// Runs one tick of the tower's targeting and attack logic.
    pub fn game_update<F>(&mut self, context: &mut TowerContext<'_, F>, out: &mut Vec<Command>)
    where
        F: TargetField + ?Sized,
    {
        match self {
            Self::Laser(laser) => laser.game_update(context, out),
            Self::Mortar(mortar) => mortar.game_update(context, out),
        }
    }
}

/// Validated prototypes new towers are cloned from.
#[derive(Clone, Debug)]
pub struct TowerFactory {
    laser: LaserTower,
    mortar: MortarTower,
}

impl TowerFactory {
    /// Validates both tower configurations, failing fast on unusable tuning.
    pub fn new(laser: LaserConfig, mortar: MortarConfig) -> Result<Self, TowerConfigError> {
        Ok(Self {
            laser: LaserTower::new(laser)?,
            mortar: MortarTower::new(mortar)?,
        })
    }

    /// Builds a fresh tower of the requested kind.
    #[must_use]
    pub fn build(&self, kind: TowerKind) -> Tower {
        match kind {
            TowerKind::Laser => Tower::Laser(self.laser.clone()),
            TowerKind::Mortar => Tower::Mortar(self.mortar.clone()),
        }
    }
}

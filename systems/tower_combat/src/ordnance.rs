use glam::Vec3;
use tile_defence_core::{Command, TargetField};
use tile_defence_system_tower_targeting::TargetAcquisition;

use crate::GRAVITY;

/// Seconds an explosion stays visible after detonating.
pub const EXPLOSION_DURATION: f32 = 0.5;

/// Shell in flight towards its target point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shell {
    launch_point: Vec3,
    target_point: Vec3,
    velocity: Vec3,
    blast_radius: f32,
    damage: f32,
    age: f32,
}

impl Shell {
    /// Creates a freshly launched shell.
    #[must_use]
    pub const fn new(
        launch_point: Vec3,
        target_point: Vec3,
        velocity: Vec3,
        blast_radius: f32,
        damage: f32,
    ) -> Self {
        Self {
            launch_point,
            target_point,
            velocity,
            blast_radius,
            damage,
            age: 0.0,
        }
    }

    /// Builds a shell from a launch command, ignoring every other command.
    #[must_use]
    pub fn from_command(command: &Command) -> Option<Self> {
        match *command {
            Command::LaunchShell {
                launch_point,
                target_point,
                velocity,
                blast_radius,
                damage,
            } => Some(Self::new(
                launch_point,
                target_point,
                velocity,
                blast_radius,
                damage,
            )),
            _ => None,
        }
    }

    /// Position along the trajectory after `age` seconds of flight.
    #[must_use]
    pub fn position_at(&self, age: f32) -> Vec3 {
        let mut position = self.launch_point + self.velocity * age;
        position.y -= 0.5 * GRAVITY * age * age;
        position
    }

    /// Current position of the shell.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position_at(self.age)
    }

    /// Point the shell explodes at.
    #[must_use]
    pub const fn target_point(&self) -> Vec3 {
        self.target_point
    }

    /// Seconds since launch.
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }

    /// Advances the flight and reports whether the shell is still airborne.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.age += dt;
        self.position().y > 0.0
    }
}

/// Area blast left behind by a landed shell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Explosion {
    position: Vec3,
    radius: f32,
    age: f32,
}

impl Explosion {
    /// Detonates at `position`, damaging every enemy within `radius`.
    pub fn detonate<F>(
        position: Vec3,
        radius: f32,
        damage: f32,
        field: &F,
        acquisition: &mut TargetAcquisition,
        out: &mut Vec<Command>,
    ) -> Self
    where
        F: TargetField + ?Sized,
    {
        if damage > 0.0 && acquisition.fill_buffer(field, position, radius) {
            out.extend(acquisition.buffered().iter().map(|target| Command::ApplyDamage {
                enemy: target.enemy(),
                amount: damage,
            }));
        }

        Self {
            position,
            radius,
            age: 0.0,
        }
    }

    /// Center of the blast.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Radius of the blast.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Seconds since detonation.
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }
}

/// Shells in flight and recent explosions.
#[derive(Clone, Debug, Default)]
pub struct Ordnance {
    shells: Vec<Shell>,
    explosions: Vec<Explosion>,
}

impl Ordnance {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a launched shell.
    pub fn launch(&mut self, shell: Shell) {
        self.shells.push(shell);
    }

    /// Ages explosions, moves shells and detonates every shell that landed.
    pub fn game_update<F>(
        &mut self,
        dt: f32,
        field: &F,
        acquisition: &mut TargetAcquisition,
        out: &mut Vec<Command>,
    ) where
        F: TargetField + ?Sized,
    {
        self.explosions.retain_mut(|explosion| {
            explosion.age += dt;
            explosion.age < EXPLOSION_DURATION
        });

        let explosions = &mut self.explosions;
        self.shells.retain_mut(|shell| {
            if shell.advance(dt) {
                return true;
            }
            explosions.push(Explosion::detonate(
                shell.target_point,
                shell.blast_radius,
                shell.damage,
                field,
                acquisition,
                out,
            ));
            false
        });
    }

    /// Shells currently in flight.
    #[must_use]
    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    /// Explosions still visible.
    #[must_use]
    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    /// Whether nothing is in flight or exploding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shells.is_empty() && self.explosions.is_empty()
    }

    /// Removes every shell and explosion.
    pub fn clear(&mut self) {
        self.shells.clear();
        self.explosions.clear();
    }
}

//! Tile-to-tile path following with smooth turns.

use std::f32::consts::PI;

use glam::{Quat, Vec3};
use tile_defence_core::{Direction, DirectionChange, PathField, PathStep, TileCoord};

/// Outcome of advancing an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AgentStatus {
    /// Still on its way.
    Walking,
    /// Walked onto the center of a destination tile.
    Arrived,
    /// Entered a tile that no longer has a path.
    Lost,
}

/// Movement state of a single enemy.
///
/// The agent moves between exit points of consecutive tiles. Straight moves
/// interpolate the position, turns rotate the model offset around a pivot on
/// the tile edge or corner. Progress runs from zero to one per move and is
/// advanced at a rate that keeps the walking speed constant along arcs.
#[derive(Clone, Debug)]
pub(crate) struct PathAgent {
    tile_from: TileCoord,
    tile_to: Option<TileCoord>,
    position_from: Vec3,
    position_to: Vec3,
    direction: Direction,
    direction_change: DirectionChange,
    angle_from: f32,
    angle_to: f32,
    progress: f32,
    progress_factor: f32,
    speed: f32,
    path_offset: f32,
    pivot: Vec3,
    model_offset: f32,
    angle: f32,
}

impl PathAgent {
    /// Places an agent at the center of `tile`, heading for its exit point.
    ///
    /// Returns `None` when the tile has nowhere to go.
    pub(crate) fn spawn(tile: TileCoord, step: PathStep, speed: f32, path_offset: f32) -> Option<Self> {
        let direction = step.direction?;
        let next = step.next?;
        let angle = direction.angle_degrees();

        Some(Self {
            tile_from: tile,
            tile_to: Some(next),
            position_from: step.center,
            position_to: step.exit_point,
            direction,
            direction_change: DirectionChange::None,
            angle_from: angle,
            angle_to: angle,
            progress: 0.0,
            progress_factor: 2.0 * speed,
            speed,
            path_offset,
            pivot: step.center,
            model_offset: path_offset,
            angle,
        })
    }

    /// Tile the agent is currently leaving.
    pub(crate) const fn tile(&self) -> TileCoord {
        self.tile_from
    }

    /// Heading in degrees, clockwise from north.
    pub(crate) const fn heading_degrees(&self) -> f32 {
        self.angle
    }

    /// Ground-level position of the agent's model.
    pub(crate) fn position(&self) -> Vec3 {
        let rotation = Quat::from_rotation_y(self.angle.to_radians());
        self.pivot + rotation * Vec3::new(self.model_offset, 0.0, 0.0)
    }

    pub(crate) fn advance<P>(&mut self, dt: f32, path: &P) -> AgentStatus
    where
        P: PathField + ?Sized,
    {
        self.progress += dt * self.progress_factor;
        while self.progress >= 1.0 {
            let Some(tile_to) = self.tile_to else {
                return AgentStatus::Arrived;
            };
            self.progress = (self.progress - 1.0) / self.progress_factor;
            let Some(step) = path.path_step(tile_to) else {
                return AgentStatus::Lost;
            };
            self.prepare_next(tile_to, step);
            self.progress *= self.progress_factor;
        }

        if self.direction_change == DirectionChange::None {
            self.pivot = self.position_from.lerp(self.position_to, self.progress);
        } else {
            self.angle = self.angle_from + (self.angle_to - self.angle_from) * self.progress;
        }
        AgentStatus::Walking
    }

    fn prepare_next(&mut self, tile: TileCoord, step: PathStep) {
        self.tile_from = tile;
        self.position_from = self.position_to;

        let (Some(next), Some(direction)) = (step.next, step.direction) else {
            self.prepare_outro(step.center);
            return;
        };

        self.tile_to = Some(next);
        self.position_to = step.exit_point;
        self.direction_change = self.direction.direction_change_to(direction);
        self.direction = direction;
        self.angle_from = self.angle_to;

        match self.direction_change {
            DirectionChange::None => self.prepare_forward(),
            DirectionChange::TurnRight => self.prepare_turn(90.0, -0.5),
            DirectionChange::TurnLeft => self.prepare_turn(-90.0, 0.5),
            DirectionChange::TurnAround => self.prepare_turn_around(),
        }
    }

    fn prepare_forward(&mut self) {
        self.angle_to = self.direction.angle_degrees();
        self.angle = self.angle_to;
        self.model_offset = self.path_offset;
        self.progress_factor = self.speed;
    }

    fn prepare_turn(&mut self, sweep: f32, pivot_offset: f32) {
        self.angle_to = self.angle_from + sweep;
        self.model_offset = self.path_offset + pivot_offset;
        self.pivot = self.position_from + self.direction.half_vector();
        let radius = self.model_offset.abs();
        self.progress_factor = self.speed / (PI * 0.5 * radius);
    }

    fn prepare_turn_around(&mut self) {
        let sweep = if self.path_offset < 0.0 { 180.0 } else { -180.0 };
        self.angle_to = self.angle_from + sweep;
        self.model_offset = self.path_offset;
        self.pivot = self.position_from;
        self.progress_factor = self.speed / (PI * self.path_offset.abs().max(0.2));
    }

    fn prepare_outro(&mut self, center: Vec3) {
        self.tile_to = None;
        self.position_to = center;
        self.direction_change = DirectionChange::None;
        self.angle_to = self.direction.angle_degrees();
        self.angle = self.angle_to;
        self.model_offset = self.path_offset;
        self.progress_factor = 2.0 * self.speed;
    }
}

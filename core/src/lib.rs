#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Defence engine.
//!
//! This crate defines the message surface that connects the driver, the
//! authoritative board, and the pure systems. Systems emit [`Command`] values
//! describing desired mutations (content toggles, spawns, damage), the owners
//! of the affected state execute them, and [`Event`] values report what
//! actually happened. Collaborators that the systems need to query without
//! owning (the path field of the board, the physical target field of the
//! enemies) are expressed as the [`PathField`] and [`TargetField`] traits.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Tile Defence.";

/// Commands that express all permissible mutations of the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Toggles a destination on the provided tile.
    ToggleDestination {
        /// Tile whose content should change.
        tile: TileCoord,
    },
    /// Toggles a wall on the provided tile.
    ToggleWall {
        /// Tile whose content should change.
        tile: TileCoord,
    },
    /// Toggles a spawn point on the provided tile.
    ToggleSpawnPoint {
        /// Tile whose content should change.
        tile: TileCoord,
    },
    /// Toggles a tower of the provided kind on the tile.
    ToggleTower {
        /// Tile whose content should change.
        tile: TileCoord,
        /// Kind of tower to place, replace or remove.
        kind: TowerKind,
    },
    /// Requests that a new enemy enters the board at one of its spawn points.
    SpawnEnemy {
        /// Factory responsible for configuring the enemy.
        factory: EnemyFactoryId,
        /// Kind of enemy requested from the factory.
        kind: EnemyKind,
    },
    /// Subtracts health from a targeted enemy.
    ApplyDamage {
        /// Enemy receiving the damage.
        enemy: EnemyId,
        /// Non-negative amount of health to subtract.
        amount: f32,
    },
    /// Launches a ballistic shell toward a ground-level target point.
    LaunchShell {
        /// World-space point the shell leaves from.
        launch_point: Vec3,
        /// Ground-level point the shell explodes at.
        target_point: Vec3,
        /// Initial velocity of the shell.
        velocity: Vec3,
        /// Radius of the area damaged by the explosion.
        blast_radius: f32,
        /// Damage applied to every enemy caught in the blast.
        damage: f32,
    },
}

/// Events broadcast after commands have been processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a tile now holds different content.
    ContentChanged {
        /// Tile that changed.
        tile: TileCoord,
        /// Content the tile holds after the change.
        content: ContentKind,
    },
    /// Reports that a toggle was refused and the board left untouched.
    ContentRejected {
        /// Tile targeted by the toggle.
        tile: TileCoord,
        /// Content the toggle attempted to place or remove.
        requested: ContentKind,
        /// Specific reason the toggle failed.
        reason: PlacementError,
    },
    /// Confirms that an enemy entered the board.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Kind of the spawned enemy.
        kind: EnemyKind,
        /// Spawn point tile the enemy started on.
        tile: TileCoord,
    },
    /// Reports that an enemy walked off a destination tile.
    EnemyReachedDestination {
        /// Enemy that reached the destination.
        enemy: EnemyId,
    },
    /// Reports that an enemy ran out of health and was removed.
    EnemyDefeated {
        /// Enemy that was defeated.
        enemy: EnemyId,
    },
}

/// Location of a single tile expressed as column and row coordinates.
///
/// Columns grow toward the east (+x), rows grow toward the north (+z).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Cardinal directions on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward increasing row indices (+z).
    North,
    /// Toward increasing column indices (+x).
    East,
    /// Toward decreasing row indices (-z).
    South,
    /// Toward decreasing column indices (-x).
    West,
}

impl Direction {
    const fn index(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Vector spanning half a tile in this direction.
    #[must_use]
    pub const fn half_vector(self) -> Vec3 {
        match self {
            Self::North => Vec3::new(0.0, 0.0, 0.5),
            Self::East => Vec3::new(0.5, 0.0, 0.0),
            Self::South => Vec3::new(0.0, 0.0, -0.5),
            Self::West => Vec3::new(-0.5, 0.0, 0.0),
        }
    }

    /// Heading around the vertical axis, measured clockwise from north.
    #[must_use]
    pub const fn angle_degrees(self) -> f32 {
        match self {
            Self::North => 0.0,
            Self::East => 90.0,
            Self::South => 180.0,
            Self::West => 270.0,
        }
    }

    /// Classifies the turn needed to go from `self` to `next`.
    #[must_use]
    pub const fn direction_change_to(self, next: Direction) -> DirectionChange {
        let current = self.index();
        let next = next.index();
        if current == next {
            DirectionChange::None
        } else if current + 1 == next || current == next + 3 {
            DirectionChange::TurnRight
        } else if current == next + 1 || current + 3 == next {
            DirectionChange::TurnLeft
        } else {
            DirectionChange::TurnAround
        }
    }
}

/// Turn an agent performs when its path direction changes between tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectionChange {
    /// Keep heading the same way.
    None,
    /// Quarter turn clockwise.
    TurnRight,
    /// Quarter turn counter-clockwise.
    TurnLeft,
    /// Half turn.
    TurnAround,
}

/// Content that may occupy a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentKind {
    /// Nothing placed on the tile.
    Empty,
    /// Tile enemies are trying to reach.
    Destination,
    /// Obstacle that blocks the path.
    Wall,
    /// Tile enemies enter the board from.
    SpawnPoint,
    /// Tower of the provided kind; blocks the path.
    Tower(TowerKind),
}

impl ContentKind {
    /// Reports whether the content prevents paths from expanding through it.
    #[must_use]
    pub const fn blocks_path(self) -> bool {
        matches!(self, Self::Wall | Self::Tower(_))
    }
}

/// Types of towers that can be constructed on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Continuous beam that damages its locked target every tick.
    Laser,
    /// Ballistic launcher that lobs shells with area damage.
    Mortar,
}

/// Enemy size classes offered by every enemy factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Small, usually fast enemy.
    Small,
    /// Default enemy.
    Medium,
    /// Large, usually sturdy enemy.
    Large,
}

/// Identifier of an enemy, bound to one incarnation of its storage slot.
///
/// Slots are recycled; the generation distinguishes an enemy from any later
/// occupant of the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId {
    slot: u32,
    generation: u32,
}

impl EnemyId {
    /// Creates an identifier for the provided slot incarnation.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Storage slot the enemy occupies.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Incarnation counter of the slot.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Identifier of a registered enemy factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyFactoryId(u32);

impl EnemyFactoryId {
    /// Creates a new factory identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Reasons a content toggle may be rejected by the board.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum PlacementError {
    /// The requested tile lies outside the board.
    #[error("tile lies outside the board")]
    OutOfBounds,
    /// The tile holds content the toggle cannot replace.
    #[error("tile holds content that cannot be replaced by this toggle")]
    Occupied,
    /// The edit would leave some tile without a path to a destination.
    #[error("edit would leave a tile without a path to a destination")]
    Disconnects,
    /// The edit would remove the only destination.
    #[error("the board must keep at least one destination")]
    LastDestination,
    /// The edit would remove the only spawn point.
    #[error("the board must keep at least one spawn point")]
    LastSpawnPoint,
}

/// Inclusive range of floating point values that can be sampled uniformly.
///
/// Deserialises from a `[min, max]` pair; reversed bounds are swapped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct FloatRange {
    min: f32,
    max: f32,
}

impl FloatRange {
    /// Creates a range, ordering the bounds if needed.
    #[must_use]
    pub fn new(min: f32, max: f32) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Creates a range containing a single value.
    #[must_use]
    pub const fn constant(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound of the range.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Reports whether both bounds are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Restricts both bounds to `lower..=upper`.
    #[must_use]
    pub fn clamped(self, lower: f32, upper: f32) -> Self {
        Self::new(self.min.clamp(lower, upper), self.max.clamp(lower, upper))
    }

    /// Samples a value uniformly from the range.
    ///
    /// The bounds must be finite; see [`FloatRange::is_finite`].
    pub fn random_value_in_range<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl From<[f32; 2]> for FloatRange {
    fn from(bounds: [f32; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}

impl From<FloatRange> for [f32; 2] {
    fn from(range: FloatRange) -> Self {
        [range.min, range.max]
    }
}

/// Bit set of collision categories consulted by overlap queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Category occupied by enemy hit points.
    pub const ENEMY: LayerMask = LayerMask(1 << 9);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Reports whether the two masks share any category.
    #[must_use]
    pub const fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// Hittable reference point of an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetPoint {
    enemy: EnemyId,
}

impl TargetPoint {
    /// Creates a target point for the provided enemy.
    #[must_use]
    pub const fn new(enemy: EnemyId) -> Self {
        Self { enemy }
    }

    /// Enemy owning the target point.
    #[must_use]
    pub const fn enemy(&self) -> EnemyId {
        self.enemy
    }
}

/// Current physical state of a valid target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSample {
    /// World-space position of the hit point.
    pub position: Vec3,
    /// Visual scale of the owning enemy.
    pub scale: f32,
}

/// Spatial collaborator answering overlap queries about targets.
pub trait TargetField {
    /// Writes every target whose collider overlaps the vertical capsule
    /// spanning `bottom..top` with the provided radius into `out`.
    ///
    /// Returns the number of entries written, never more than `out.len()`.
    fn overlap_capsule(
        &self,
        bottom: Vec3,
        top: Vec3,
        radius: f32,
        layers: LayerMask,
        out: &mut [TargetPoint],
    ) -> usize;

    /// Resolves a target to its current position and scale.
    ///
    /// Returns `None` once the owning enemy was destroyed or recycled.
    fn resolve(&self, target: TargetPoint) -> Option<TargetSample>;
}

/// Path data of a single tile as seen by path-following agents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStep {
    /// World-space center of the tile.
    pub center: Vec3,
    /// Point on the tile edge agents aim for when leaving the tile.
    pub exit_point: Vec3,
    /// Direction toward the next tile, `None` on destinations.
    pub direction: Option<Direction>,
    /// Next tile on the path, `None` on destinations.
    pub next: Option<TileCoord>,
}

/// Collaborator exposing the computed path of every tile.
pub trait PathField {
    /// Path data of the provided tile, `None` outside the board or when the
    /// tile has no path.
    fn path_step(&self, tile: TileCoord) -> Option<PathStep>;
}

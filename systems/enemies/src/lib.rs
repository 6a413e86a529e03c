#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy storage, path following and hit-point queries.
//!
//! Enemies live in a slot arena. Identifiers carry the slot generation so a
//! tower holding on to a recycled enemy resolves to nothing instead of to the
//! slot's next occupant. The collection doubles as the [`TargetField`] towers
//! and explosions query.

use glam::Vec3;
use rand::Rng;
use tile_defence_core::{
    EnemyFactoryId, EnemyId, EnemyKind, Event, LayerMask, PathField, TargetField, TargetPoint,
    TargetSample, TileCoord,
};

mod agent;
mod factory;

use agent::{AgentStatus, PathAgent};
pub use factory::{EnemyConfig, EnemyFactories, EnemyFactory, EnemyTraits, FactoryError};

/// Height of the hit point above the ground per unit of scale.
pub const TARGET_HEIGHT: f32 = 0.25;

/// Radius of the hit point collider per unit of scale.
pub const TARGET_RADIUS: f32 = 0.125;

/// Reasons a spawn request could not be honoured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// No factory is registered under the requested identifier.
    #[error("no enemy factory registered as {0:?}")]
    UnknownFactory(EnemyFactoryId),
    /// The spawn tile has no path toward a destination.
    #[error("spawn tile {0:?} has no path to a destination")]
    NoPath(TileCoord),
}

#[derive(Clone, Debug)]
struct Enemy {
    kind: EnemyKind,
    scale: f32,
    health: f32,
    agent: PathAgent,
}

impl Enemy {
    fn target_position(&self) -> Vec3 {
        self.agent.position() + Vec3::Y * (TARGET_HEIGHT * self.scale)
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    enemy: Option<Enemy>,
}

/// Every enemy currently on the board.
#[derive(Clone, Debug, Default)]
pub struct Enemies {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Enemies {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enemies on the board.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Whether the board is free of enemies.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Rolls a new enemy from the factory and places it on `tile`.
    pub fn spawn<P, R>(
        &mut self,
        factories: &EnemyFactories,
        factory: EnemyFactoryId,
        kind: EnemyKind,
        tile: TileCoord,
        path: &P,
        rng: &mut R,
    ) -> Result<EnemyId, SpawnError>
    where
        P: PathField + ?Sized,
        R: Rng + ?Sized,
    {
        let traits = factories
            .get(factory)
            .ok_or(SpawnError::UnknownFactory(factory))?
            .roll(kind, rng);
        let agent = path
            .path_step(tile)
            .and_then(|step| PathAgent::spawn(tile, step, traits.speed, traits.path_offset))
            .ok_or(SpawnError::NoPath(tile))?;

        let enemy = Enemy {
            kind,
            scale: traits.scale,
            health: traits.health,
            agent,
        };

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.enemy = Some(enemy);
        self.live += 1;

        let id = EnemyId::new(slot, entry.generation);
        tracing::debug!(?id, ?kind, ?tile, "enemy spawned");
        Ok(id)
    }

    /// Subtracts `amount` from the enemy's health.
    ///
    /// Returns `false` when the identifier is stale or the amount is negative.
    pub fn apply_damage(&mut self, id: EnemyId, amount: f32) -> bool {
        debug_assert!(amount >= 0.0, "negative damage {amount}");
        if amount < 0.0 {
            return false;
        }
        match self.get_mut(id) {
            Some(enemy) => {
                enemy.health -= amount;
                true
            }
            None => false,
        }
    }

    /// Moves every enemy along the path, removing defeated enemies and those
    /// that reached a destination.
    pub fn game_update<P>(&mut self, dt: f32, path: &P, out: &mut Vec<Event>)
    where
        P: PathField + ?Sized,
    {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            let Some(enemy) = slot.enemy.as_mut() else {
                continue;
            };
            let id = EnemyId::new(index as u32, slot.generation);

            if enemy.health <= 0.0 {
                out.push(Event::EnemyDefeated { enemy: id });
                self.recycle(index);
                continue;
            }

            match enemy.agent.advance(dt, path) {
                AgentStatus::Walking => {}
                AgentStatus::Arrived => {
                    out.push(Event::EnemyReachedDestination { enemy: id });
                    self.recycle(index);
                }
                AgentStatus::Lost => {
                    tracing::warn!(?id, tile = ?enemy.agent.tile(), "enemy lost its path");
                    self.recycle(index);
                }
            }
        }
    }

    /// Removes every enemy without reporting events.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].enemy.is_some() {
                self.recycle(index);
            }
        }
    }

    /// Captures the current state of every enemy.
    #[must_use]
    pub fn view(&self) -> EnemyView {
        let snapshots = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.enemy.as_ref().map(|enemy| EnemySnapshot {
                    id: EnemyId::new(index as u32, slot.generation),
                    kind: enemy.kind,
                    tile: enemy.agent.tile(),
                    position: enemy.agent.position(),
                    heading_degrees: enemy.agent.heading_degrees(),
                    scale: enemy.scale,
                    health: enemy.health,
                })
            })
            .collect();
        EnemyView { snapshots }
    }

    fn get(&self, id: EnemyId) -> Option<&Enemy> {
        let slot = self.slots.get(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.enemy.as_ref()
    }

    fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        let slot = self.slots.get_mut(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.enemy.as_mut()
    }

    fn recycle(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        if slot.enemy.take().is_some() {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index as u32);
            self.live -= 1;
        }
    }
}

impl TargetField for Enemies {
    fn overlap_capsule(
        &self,
        bottom: Vec3,
        top: Vec3,
        radius: f32,
        layers: LayerMask,
        out: &mut [TargetPoint],
    ) -> usize {
        if !layers.intersects(LayerMask::ENEMY) {
            return 0;
        }

        let mut count = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            if count == out.len() {
                break;
            }
            let Some(enemy) = slot.enemy.as_ref() else {
                continue;
            };
            if enemy.health <= 0.0 {
                continue;
            }
            let reach = radius + TARGET_RADIUS * enemy.scale;
            if distance_to_segment(enemy.target_position(), bottom, top) <= reach {
                out[count] = TargetPoint::new(EnemyId::new(index as u32, slot.generation));
                count += 1;
            }
        }
        count
    }

    fn resolve(&self, target: TargetPoint) -> Option<TargetSample> {
        let enemy = self.get(target.enemy())?;
        if enemy.health <= 0.0 {
            return None;
        }
        Some(TargetSample {
            position: enemy.target_position(),
            scale: enemy.scale,
        })
    }
}

fn distance_to_segment(point: Vec3, start: Vec3, end: Vec3) -> f32 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared <= f32::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(segment) / length_squared).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Immutable representation of a single enemy's state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Size class of the enemy.
    pub kind: EnemyKind,
    /// Tile the enemy is currently leaving.
    pub tile: TileCoord,
    /// Ground-level position of the enemy.
    pub position: Vec3,
    /// Heading in degrees, clockwise from north.
    pub heading_degrees: f32,
    /// Visual scale.
    pub scale: f32,
    /// Remaining health.
    pub health: f32,
}

/// Read-only view of every enemy on the board.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Iterator over the captured snapshots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

//! Pooled storage for tile content.

use std::collections::BTreeMap;

use tile_defence_core::ContentKind;
use tile_defence_system_tower_combat::{Tower, TowerFactory};

/// Handle to content handed out by a [`ContentPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentId {
    index: u32,
    generation: u32,
}

/// Content placed on a tile.
#[derive(Clone, Debug)]
pub struct Content {
    kind: ContentKind,
    tower: Option<Tower>,
}

impl Content {
    /// Kind of the content.
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Tower state when the content is a tower.
    #[must_use]
    pub const fn tower(&self) -> Option<&Tower> {
        self.tower.as_ref()
    }

    pub(crate) fn tower_mut(&mut self) -> Option<&mut Tower> {
        self.tower.as_mut()
    }
}

#[derive(Clone, Debug)]
struct PoolSlot {
    generation: u32,
    content: Option<Content>,
}

/// Arena of tile content with one free list per content kind.
///
/// Towers are rebuilt from the factory whenever their slot is handed out
/// again, so recycled content never carries state from a previous placement.
#[derive(Clone, Debug)]
pub struct ContentPool {
    factory: TowerFactory,
    slots: Vec<PoolSlot>,
    free: BTreeMap<ContentKind, Vec<u32>>,
    live: usize,
}

impl ContentPool {
    /// Creates an empty pool building towers from `factory`.
    #[must_use]
    pub fn new(factory: TowerFactory) -> Self {
        Self {
            factory,
            slots: Vec::new(),
            free: BTreeMap::new(),
            live: 0,
        }
    }

    /// Hands out fresh content of the requested kind.
    pub fn get(&mut self, kind: ContentKind) -> ContentId {
        let tower = match kind {
            ContentKind::Tower(tower_kind) => Some(self.factory.build(tower_kind)),
            _ => None,
        };
        let content = Content { kind, tower };

        let index = match self.free.get_mut(&kind).and_then(Vec::pop) {
            Some(index) => index,
            None => {
                self.slots.push(PoolSlot {
                    generation: 0,
                    content: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.content = Some(content);
        self.live += 1;
        ContentId {
            index,
            generation: slot.generation,
        }
    }

    /// Returns content to the pool.
    ///
    /// # Panics
    ///
    /// Panics when `id` was not handed out by this pool or was already
    /// reclaimed.
    pub fn reclaim(&mut self, id: ContentId) {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation);
        let Some(content) = slot.and_then(|slot| {
            slot.generation = slot.generation.wrapping_add(1);
            slot.content.take()
        }) else {
            panic!("reclaimed content {id:?} that this pool does not own");
        };

        self.free.entry(content.kind).or_default().push(id.index);
        self.live -= 1;
    }

    /// Content behind a live handle.
    #[must_use]
    pub fn content(&self, id: ContentId) -> Option<&Content> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.content.as_ref())
    }

    pub(crate) fn content_mut(&mut self, id: ContentId) -> Option<&mut Content> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.content.as_mut())
    }

    /// Number of handles currently handed out.
    #[must_use]
    pub const fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::TowerKind;
    use tile_defence_system_tower_combat::{LaserConfig, MortarConfig};

    fn pool() -> ContentPool {
        ContentPool::new(
            TowerFactory::new(LaserConfig::default(), MortarConfig::default())
                .expect("default tuning"),
        )
    }

    #[test]
    fn reclaimed_slots_are_reused_per_kind() {
        let mut pool = pool();
        let wall = pool.get(ContentKind::Wall);
        pool.reclaim(wall);

        let empty = pool.get(ContentKind::Empty);
        assert_ne!(empty.index, wall.index, "walls are only recycled as walls");

        let second_wall = pool.get(ContentKind::Wall);
        assert_eq!(second_wall.index, wall.index);
        assert_ne!(second_wall, wall, "recycled handles are distinct");
        assert!(pool.content(wall).is_none());
        assert_eq!(pool.live(), 2);
    }

    #[test]
    fn towers_carry_their_state() {
        let mut pool = pool();
        let id = pool.get(ContentKind::Tower(TowerKind::Mortar));
        let content = pool.content(id).expect("live content");

        assert_eq!(content.kind(), ContentKind::Tower(TowerKind::Mortar));
        assert_eq!(content.tower().map(Tower::kind), Some(TowerKind::Mortar));
        assert!(pool.get(ContentKind::Empty) != id);
    }

    #[test]
    #[should_panic(expected = "does not own")]
    fn reclaiming_twice_panics() {
        let mut pool = pool();
        let id = pool.get(ContentKind::Empty);
        pool.reclaim(id);
        pool.reclaim(id);
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state for Tile Defence.
//!
//! The board owns the tile grid, the content placed on it and the path every
//! tile follows toward the nearest destination. All edits arrive as
//! [`Command`]s through [`apply`] and are confirmed or refused with
//! [`Event`]s. Edits that would leave any tile without a path are reverted,
//! so observers never see a disconnected board.

mod content;
mod graph;

use tile_defence_core::{
    Command, ContentKind, Event, PathField, PathStep, PlacementError, TargetField, TileCoord,
    TowerKind,
};
use tile_defence_system_tower_combat::{
    LaserConfig, MortarConfig, TowerConfigError, TowerContext, TowerFactory,
};
use tile_defence_system_tower_targeting::TargetAcquisition;

pub use content::{Content, ContentId, ContentPool};
use graph::TileGraph;

/// Errors raised while constructing a board.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum BoardError {
    /// The board cannot hold both a destination and a spawn point.
    #[error("a {columns}x{rows} board is too small, at least two tiles are required")]
    TooSmall {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// Tower tuning was rejected.
    #[error(transparent)]
    Tower(#[from] TowerConfigError),
}

#[derive(Clone, Copy, Debug)]
struct Placed {
    id: ContentId,
    kind: ContentKind,
}

/// Tile grid with its content, paths, spawn points and towers.
#[derive(Clone, Debug)]
pub struct Board {
    graph: TileGraph,
    pool: ContentPool,
    tiles: Vec<Placed>,
    spawn_points: Vec<TileCoord>,
    towers: Vec<TileCoord>,
}

impl Board {
    /// Creates a board with a destination in the middle and a spawn point in
    /// the south-west corner.
    pub fn new(columns: u32, rows: u32, factory: TowerFactory) -> Result<Self, BoardError> {
        let tile_count = u64::from(columns) * u64::from(rows);
        if tile_count < 2 {
            return Err(BoardError::TooSmall { columns, rows });
        }

        let graph = TileGraph::new(columns, rows);
        let mut pool = ContentPool::new(factory);
        let tiles = (0..graph.len())
            .map(|_| Placed {
                id: pool.get(ContentKind::Empty),
                kind: ContentKind::Empty,
            })
            .collect();

        let mut board = Self {
            graph,
            pool,
            tiles,
            spawn_points: Vec::new(),
            towers: Vec::new(),
        };
        board.place_defaults();
        Ok(board)
    }

    /// Creates a board whose towers are built from the provided tuning.
    pub fn with_tower_configs(
        columns: u32,
        rows: u32,
        laser: LaserConfig,
        mortar: MortarConfig,
    ) -> Result<Self, BoardError> {
        Self::new(columns, rows, TowerFactory::new(laser, mortar)?)
    }

    /// Removes all content and restores the initial layout.
    pub fn clear(&mut self) {
        for index in 0..self.tiles.len() {
            if self.tiles[index].kind != ContentKind::Empty {
                self.replace(index, ContentKind::Empty);
            }
        }
        self.spawn_points.clear();
        self.towers.clear();
        self.place_defaults();
    }

    fn place_defaults(&mut self) {
        let center = self.graph.len() / 2;
        self.replace(center, ContentKind::Destination);
        let corner = self.graph.coord(0);
        self.replace(0, ContentKind::SpawnPoint);
        self.spawn_points.push(corner);
        let _ = self.compute_paths();
    }

    /// Runs every tower in placement order.
    pub fn game_update<F>(
        &mut self,
        dt: f32,
        field: &F,
        acquisition: &mut TargetAcquisition,
        out: &mut Vec<Command>,
    ) where
        F: TargetField + ?Sized,
    {
        for tile in &self.towers {
            let Some(index) = self.graph.index(*tile) else {
                continue;
            };
            let position = self.graph.tile(index).center();
            let Some(tower) = self
                .pool
                .content_mut(self.tiles[index].id)
                .and_then(Content::tower_mut)
            else {
                continue;
            };

            let mut context = TowerContext {
                dt,
                position,
                field,
                acquisition: &mut *acquisition,
            };
            tower.game_update(&mut context, out);
        }
    }

    fn compute_paths(&mut self) -> bool {
        let tiles = &self.tiles;
        let connected = self.graph.compute_paths(|index| tiles[index].kind);
        tracing::debug!(connected, "paths recomputed");
        connected
    }

    fn replace(&mut self, index: usize, kind: ContentKind) {
        let id = self.pool.get(kind);
        let previous = std::mem::replace(&mut self.tiles[index], Placed { id, kind });
        self.pool.reclaim(previous.id);
    }

    fn destination_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|placed| placed.kind == ContentKind::Destination)
            .count()
    }

    fn toggle_destination(&mut self, index: usize) -> Result<ContentKind, PlacementError> {
        match self.tiles[index].kind {
            ContentKind::Destination => {
                let last = self.destination_count() == 1;
                self.replace(index, ContentKind::Empty);
                if self.compute_paths() {
                    return Ok(ContentKind::Empty);
                }
                self.replace(index, ContentKind::Destination);
                let _ = self.compute_paths();
                Err(if last {
                    PlacementError::LastDestination
                } else {
                    PlacementError::Disconnects
                })
            }
            ContentKind::Empty => {
                self.replace(index, ContentKind::Destination);
                let _ = self.compute_paths();
                Ok(ContentKind::Destination)
            }
            _ => Err(PlacementError::Occupied),
        }
    }

    fn toggle_wall(&mut self, index: usize) -> Result<ContentKind, PlacementError> {
        match self.tiles[index].kind {
            ContentKind::Wall => {
                self.replace(index, ContentKind::Empty);
                let _ = self.compute_paths();
                Ok(ContentKind::Empty)
            }
            ContentKind::Empty => self.place_blocking(index, ContentKind::Wall),
            _ => Err(PlacementError::Occupied),
        }
    }

    fn toggle_spawn_point(&mut self, index: usize) -> Result<ContentKind, PlacementError> {
        let tile = self.graph.coord(index);
        match self.tiles[index].kind {
            ContentKind::SpawnPoint => {
                if self.spawn_points.len() <= 1 {
                    return Err(PlacementError::LastSpawnPoint);
                }
                self.spawn_points.retain(|spawn| *spawn != tile);
                self.replace(index, ContentKind::Empty);
                Ok(ContentKind::Empty)
            }
            ContentKind::Empty => {
                self.replace(index, ContentKind::SpawnPoint);
                self.spawn_points.push(tile);
                Ok(ContentKind::SpawnPoint)
            }
            _ => Err(PlacementError::Occupied),
        }
    }

    fn toggle_tower(
        &mut self,
        index: usize,
        kind: TowerKind,
    ) -> Result<ContentKind, PlacementError> {
        let tile = self.graph.coord(index);
        let tower = ContentKind::Tower(kind);
        match self.tiles[index].kind {
            ContentKind::Tower(current) if current == kind => {
                self.towers.retain(|placed| *placed != tile);
                self.replace(index, ContentKind::Empty);
                let _ = self.compute_paths();
                Ok(ContentKind::Empty)
            }
            ContentKind::Tower(_) => {
                self.towers.retain(|placed| *placed != tile);
                self.replace(index, tower);
                self.towers.push(tile);
                Ok(tower)
            }
            ContentKind::Empty => {
                let placed = self.place_blocking(index, tower)?;
                self.towers.push(tile);
                Ok(placed)
            }
            ContentKind::Wall => {
                self.replace(index, tower);
                self.towers.push(tile);
                Ok(tower)
            }
            _ => Err(PlacementError::Occupied),
        }
    }

    fn place_blocking(
        &mut self,
        index: usize,
        kind: ContentKind,
    ) -> Result<ContentKind, PlacementError> {
        self.replace(index, kind);
        if self.compute_paths() {
            return Ok(kind);
        }
        self.replace(index, ContentKind::Empty);
        let _ = self.compute_paths();
        Err(PlacementError::Disconnects)
    }
}

impl PathField for Board {
    fn path_step(&self, tile: TileCoord) -> Option<PathStep> {
        let index = self.graph.index(tile)?;
        let path = self.graph.tile(index);
        if !path.has_path() {
            return None;
        }
        Some(PathStep {
            center: path.center(),
            exit_point: path.exit_point(),
            direction: path.direction(),
            next: path.next().map(|next| self.graph.coord(next)),
        })
    }
}

/// Applies the provided command to the board, reporting the outcome.
///
/// Commands that do not edit the board are ignored.
pub fn apply(board: &mut Board, command: Command, out_events: &mut Vec<Event>) {
    let (tile, requested, result) = match command {
        Command::ToggleDestination { tile } => (
            tile,
            ContentKind::Destination,
            board
                .graph
                .index(tile)
                .ok_or(PlacementError::OutOfBounds)
                .and_then(|index| board.toggle_destination(index)),
        ),
        Command::ToggleWall { tile } => (
            tile,
            ContentKind::Wall,
            board
                .graph
                .index(tile)
                .ok_or(PlacementError::OutOfBounds)
                .and_then(|index| board.toggle_wall(index)),
        ),
        Command::ToggleSpawnPoint { tile } => (
            tile,
            ContentKind::SpawnPoint,
            board
                .graph
                .index(tile)
                .ok_or(PlacementError::OutOfBounds)
                .and_then(|index| board.toggle_spawn_point(index)),
        ),
        Command::ToggleTower { tile, kind } => (
            tile,
            ContentKind::Tower(kind),
            board
                .graph
                .index(tile)
                .ok_or(PlacementError::OutOfBounds)
                .and_then(|index| board.toggle_tower(index, kind)),
        ),
        Command::SpawnEnemy { .. } | Command::ApplyDamage { .. } | Command::LaunchShell { .. } => {
            return;
        }
    };

    match result {
        Ok(content) => out_events.push(Event::ContentChanged { tile, content }),
        Err(reason) => {
            tracing::warn!(?tile, ?requested, %reason, "board edit rejected");
            out_events.push(Event::ContentRejected {
                tile,
                requested,
                reason,
            });
        }
    }
}

/// Query functions that provide read-only access to the board state.
pub mod query {
    use glam::Vec3;
    use tile_defence_core::{ContentKind, Direction, TargetPoint, TileCoord, TowerKind};
    use tile_defence_system_tower_combat::{LaserBeam, Tower, TowerState};

    use super::{Board, ContentPool};

    /// Number of columns and rows.
    #[must_use]
    pub fn dimensions(board: &Board) -> (u32, u32) {
        (board.graph.columns(), board.graph.rows())
    }

    /// Content placed on the tile, `None` outside the board.
    #[must_use]
    pub fn content_at(board: &Board, tile: TileCoord) -> Option<ContentKind> {
        board.graph.index(tile).map(|index| board.tiles[index].kind)
    }

    /// Steps from the tile to the nearest destination.
    #[must_use]
    pub fn distance(board: &Board, tile: TileCoord) -> Option<u32> {
        board
            .graph
            .index(tile)
            .and_then(|index| board.graph.tile(index).distance())
    }

    /// Next tile on the path toward a destination.
    #[must_use]
    pub fn next_on_path(board: &Board, tile: TileCoord) -> Option<TileCoord> {
        board
            .graph
            .index(tile)
            .and_then(|index| board.graph.tile(index).next())
            .map(|next| board.graph.coord(next))
    }

    /// Direction toward the next tile on the path.
    #[must_use]
    pub fn path_direction(board: &Board, tile: TileCoord) -> Option<Direction> {
        board
            .graph
            .index(tile)
            .and_then(|index| board.graph.tile(index).direction())
    }

    /// Point on the tile edge agents leave the tile through.
    #[must_use]
    pub fn exit_point(board: &Board, tile: TileCoord) -> Option<Vec3> {
        board
            .graph
            .index(tile)
            .map(|index| board.graph.tile(index).exit_point())
    }

    /// World-space center of the tile.
    #[must_use]
    pub fn tile_center(board: &Board, tile: TileCoord) -> Option<Vec3> {
        board
            .graph
            .index(tile)
            .map(|index| board.graph.tile(index).center())
    }

    /// Spawn points in the order they were placed.
    #[must_use]
    pub fn spawn_points(board: &Board) -> &[TileCoord] {
        &board.spawn_points
    }

    /// Every destination tile in row-major order.
    #[must_use]
    pub fn destinations(board: &Board) -> Vec<TileCoord> {
        board
            .tiles
            .iter()
            .enumerate()
            .filter(|(_, placed)| placed.kind == ContentKind::Destination)
            .map(|(index, _)| board.graph.coord(index))
            .collect()
    }

    /// Pool backing the board's content.
    #[must_use]
    pub fn content_pool(board: &Board) -> &ContentPool {
        &board.pool
    }

    /// Captures every tower in update order.
    #[must_use]
    pub fn tower_view(board: &Board) -> TowerView {
        let snapshots = board
            .towers
            .iter()
            .filter_map(|tile| {
                let index = board.graph.index(*tile)?;
                let tower = board.pool.content(board.tiles[index].id)?.tower()?;
                Some(TowerSnapshot {
                    tile: *tile,
                    kind: tower.kind(),
                    state: tower.state(),
                    target: tower.target(),
                    targeting_range: tower.targeting_range(),
                    beam: match tower {
                        Tower::Laser(laser) => laser.beam(),
                        Tower::Mortar(_) => None,
                    },
                })
            })
            .collect();
        TowerView { snapshots }
    }

    /// Read-only snapshot describing all towers on the board.
    #[derive(Clone, Debug, Default)]
    pub struct TowerView {
        snapshots: Vec<TowerSnapshot>,
    }

    impl TowerView {
        /// Iterator over the captured tower snapshots in update order.
        pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<TowerSnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single tower's state.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct TowerSnapshot {
        /// Tile the tower stands on.
        pub tile: TileCoord,
        /// Kind of tower.
        pub kind: TowerKind,
        /// Targeting status.
        pub state: TowerState,
        /// Locked target, if any.
        pub target: Option<TargetPoint>,
        /// Radius of the tower's overlap query.
        pub targeting_range: f32,
        /// Beam drawn by a firing laser.
        pub beam: Option<LaserBeam>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(columns: u32, rows: u32) -> Board {
        Board::with_tower_configs(columns, rows, LaserConfig::default(), MortarConfig::default())
            .expect("valid board")
    }

    #[test]
    fn new_board_has_default_layout() {
        let board = board(4, 3);
        assert_eq!(
            query::content_at(&board, TileCoord::new(2, 1)),
            Some(ContentKind::Destination),
            "destination sits at index len / 2"
        );
        assert_eq!(query::spawn_points(&board), &[TileCoord::new(0, 0)]);
        assert_eq!(query::distance(&board, TileCoord::new(0, 0)), Some(3));
    }

    #[test]
    fn tiny_boards_are_rejected() {
        assert_eq!(
            Board::with_tower_configs(1, 1, LaserConfig::default(), MortarConfig::default())
                .unwrap_err(),
            BoardError::TooSmall { columns: 1, rows: 1 }
        );
        assert!(matches!(
            Board::with_tower_configs(0, 9, LaserConfig::default(), MortarConfig::default()),
            Err(BoardError::TooSmall { .. })
        ));
    }

    #[test]
    fn invalid_tower_tuning_is_reported() {
        let mortar = MortarConfig {
            mount_height: f32::INFINITY,
            ..MortarConfig::default()
        };
        assert!(matches!(
            Board::with_tower_configs(3, 3, LaserConfig::default(), mortar),
            Err(BoardError::Tower(TowerConfigError::NonFinite { .. }))
        ));
    }

    #[test]
    fn clear_restores_defaults_and_returns_content() {
        let mut board = board(3, 3);
        let mut events = Vec::new();
        apply(&mut board, Command::ToggleWall { tile: TileCoord::new(2, 2) }, &mut events);
        apply(
            &mut board,
            Command::ToggleTower {
                tile: TileCoord::new(2, 0),
                kind: TowerKind::Laser,
            },
            &mut events,
        );
        assert_eq!(query::tower_view(&board).iter().count(), 1);

        board.clear();

        assert_eq!(query::content_at(&board, TileCoord::new(2, 2)), Some(ContentKind::Empty));
        assert_eq!(query::tower_view(&board).iter().count(), 0);
        assert_eq!(query::destinations(&board), vec![TileCoord::new(1, 1)]);
        assert_eq!(query::content_pool(&board).live(), 9, "one handle per tile");
    }

    #[test]
    fn towers_replace_walls_and_each_other_in_place() {
        let mut board = board(3, 3);
        let tile = TileCoord::new(2, 2);
        let mut events = Vec::new();

        apply(&mut board, Command::ToggleWall { tile }, &mut events);
        apply(
            &mut board,
            Command::ToggleTower {
                tile,
                kind: TowerKind::Mortar,
            },
            &mut events,
        );
        apply(
            &mut board,
            Command::ToggleTower {
                tile,
                kind: TowerKind::Laser,
            },
            &mut events,
        );

        assert_eq!(
            events.last(),
            Some(&Event::ContentChanged {
                tile,
                content: ContentKind::Tower(TowerKind::Laser)
            })
        );
        let towers = query::tower_view(&board).into_vec();
        assert_eq!(towers.len(), 1);
        assert_eq!(towers[0].kind, TowerKind::Laser);

        apply(
            &mut board,
            Command::ToggleTower {
                tile,
                kind: TowerKind::Laser,
            },
            &mut events,
        );
        assert_eq!(query::content_at(&board, tile), Some(ContentKind::Empty));
        assert_eq!(query::tower_view(&board).iter().count(), 0);
    }

    #[test]
    fn occupied_and_out_of_bounds_tiles_are_refused() {
        let mut board = board(3, 3);
        let mut events = Vec::new();

        apply(&mut board, Command::ToggleWall { tile: TileCoord::new(0, 0) }, &mut events);
        apply(&mut board, Command::ToggleWall { tile: TileCoord::new(7, 0) }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::ContentRejected {
                    tile: TileCoord::new(0, 0),
                    requested: ContentKind::Wall,
                    reason: PlacementError::Occupied,
                },
                Event::ContentRejected {
                    tile: TileCoord::new(7, 0),
                    requested: ContentKind::Wall,
                    reason: PlacementError::OutOfBounds,
                },
            ]
        );
    }

    #[test]
    fn last_spawn_point_is_kept() {
        let mut board = board(3, 3);
        let mut events = Vec::new();
        let corner = TileCoord::new(0, 0);
        let other = TileCoord::new(2, 2);

        apply(&mut board, Command::ToggleSpawnPoint { tile: corner }, &mut events);
        apply(&mut board, Command::ToggleSpawnPoint { tile: other }, &mut events);
        apply(&mut board, Command::ToggleSpawnPoint { tile: corner }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::ContentRejected {
                    tile: corner,
                    requested: ContentKind::SpawnPoint,
                    reason: PlacementError::LastSpawnPoint,
                },
                Event::ContentChanged {
                    tile: other,
                    content: ContentKind::SpawnPoint,
                },
                Event::ContentChanged {
                    tile: corner,
                    content: ContentKind::Empty,
                },
            ]
        );
        assert_eq!(query::spawn_points(&board), &[other]);
    }

    #[test]
    fn non_board_commands_are_ignored() {
        let mut board = board(3, 3);
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::ApplyDamage {
                enemy: tile_defence_core::EnemyId::new(0, 0),
                amount: 1.0,
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::exit_point(&board, TileCoord::new(5, 5)), None);
        assert_eq!(
            query::tile_center(&board, TileCoord::new(1, 1)),
            Some(glam::Vec3::ZERO)
        );
    }
}

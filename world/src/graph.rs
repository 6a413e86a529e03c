//! Tile adjacency and the reverse breadth-first path search.

use std::collections::VecDeque;

use glam::Vec3;
use tile_defence_core::{ContentKind, Direction, TileCoord};

const NO_PATH: u32 = u32::MAX;

/// Path data and adjacency of a single tile.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PathTile {
    center: Vec3,
    north: Option<usize>,
    east: Option<usize>,
    south: Option<usize>,
    west: Option<usize>,
    alternative: bool,
    distance: u32,
    next: Option<usize>,
    direction: Option<Direction>,
    exit_point: Vec3,
}

impl PathTile {
    fn new(center: Vec3, alternative: bool) -> Self {
        Self {
            center,
            north: None,
            east: None,
            south: None,
            west: None,
            alternative,
            distance: NO_PATH,
            next: None,
            direction: None,
            exit_point: center,
        }
    }

    pub(crate) const fn center(&self) -> Vec3 {
        self.center
    }

    pub(crate) const fn has_path(&self) -> bool {
        self.distance != NO_PATH
    }

    /// Steps to the nearest destination, `None` without a path.
    pub(crate) const fn distance(&self) -> Option<u32> {
        if self.has_path() {
            Some(self.distance)
        } else {
            None
        }
    }

    pub(crate) const fn next(&self) -> Option<usize> {
        self.next
    }

    pub(crate) const fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub(crate) const fn exit_point(&self) -> Vec3 {
        self.exit_point
    }

    fn clear_path(&mut self) {
        self.distance = NO_PATH;
        self.next = None;
        self.direction = None;
        self.exit_point = self.center;
    }

    fn become_destination(&mut self) {
        self.distance = 0;
        self.next = None;
        self.direction = None;
        self.exit_point = self.center;
    }
}

/// Grid of tiles with four-way adjacency and per-tile path data.
///
/// Tiles are stored row-major; row zero is the southern edge and the board
/// is centered on the origin with one unit per tile.
#[derive(Clone, Debug)]
pub(crate) struct TileGraph {
    columns: u32,
    rows: u32,
    tiles: Vec<PathTile>,
    frontier: VecDeque<usize>,
}

impl TileGraph {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let offset_x = (columns as f32 - 1.0) * 0.5;
        let offset_z = (rows as f32 - 1.0) * 0.5;
        let width = columns as usize;

        let mut graph = Self {
            columns,
            rows,
            tiles: Vec::with_capacity(width * rows as usize),
            frontier: VecDeque::new(),
        };

        for row in 0..rows {
            for column in 0..columns {
                let center = Vec3::new(column as f32 - offset_x, 0.0, row as f32 - offset_z);
                let alternative = (column % 2 == 0) != (row % 2 == 0);
                let index = graph.tiles.len();
                graph.tiles.push(PathTile::new(center, alternative));

                if column > 0 {
                    graph.link_east_west(index, index - 1);
                }
                if row > 0 {
                    graph.link_north_south(index, index - width);
                }
            }
        }

        graph
    }

    fn link_east_west(&mut self, east: usize, west: usize) {
        assert!(
            self.tiles[west].east.is_none() && self.tiles[east].west.is_none(),
            "redefined east-west neighbors of tiles {west} and {east}"
        );
        self.tiles[west].east = Some(east);
        self.tiles[east].west = Some(west);
    }

    fn link_north_south(&mut self, north: usize, south: usize) {
        assert!(
            self.tiles[south].north.is_none() && self.tiles[north].south.is_none(),
            "redefined north-south neighbors of tiles {south} and {north}"
        );
        self.tiles[south].north = Some(north);
        self.tiles[north].south = Some(south);
    }

    pub(crate) const fn columns(&self) -> u32 {
        self.columns
    }

    pub(crate) const fn rows(&self) -> u32 {
        self.rows
    }

    pub(crate) fn len(&self) -> usize {
        self.tiles.len()
    }

    pub(crate) fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.column() >= self.columns || tile.row() >= self.rows {
            return None;
        }
        Some(tile.row() as usize * self.columns as usize + tile.column() as usize)
    }

    pub(crate) fn coord(&self, index: usize) -> TileCoord {
        let columns = self.columns as usize;
        TileCoord::new((index % columns) as u32, (index / columns) as u32)
    }

    pub(crate) fn tile(&self, index: usize) -> &PathTile {
        &self.tiles[index]
    }

    /// Recomputes every tile's path toward the nearest destination.
    ///
    /// Destinations seed the search. Blocking tiles receive path data when
    /// reached but never expand further. Ties between equally short routes are
    /// broken by alternating the expansion order in a checkerboard pattern,
    /// which yields zig-zag rather than L-shaped paths. Returns `false` when
    /// there is no destination or some tile cannot reach one.
    pub(crate) fn compute_paths<F>(&mut self, content: F) -> bool
    where
        F: Fn(usize) -> ContentKind,
    {
        self.frontier.clear();
        for index in 0..self.tiles.len() {
            if content(index) == ContentKind::Destination {
                self.tiles[index].become_destination();
                self.frontier.push_back(index);
            } else {
                self.tiles[index].clear_path();
            }
        }

        if self.frontier.is_empty() {
            return false;
        }

        while let Some(index) = self.frontier.pop_front() {
            let tile = self.tiles[index];
            let growth = if tile.alternative {
                [
                    (tile.north, Direction::South),
                    (tile.south, Direction::North),
                    (tile.east, Direction::West),
                    (tile.west, Direction::East),
                ]
            } else {
                [
                    (tile.west, Direction::East),
                    (tile.east, Direction::West),
                    (tile.south, Direction::North),
                    (tile.north, Direction::South),
                ]
            };

            for (neighbor, direction) in growth {
                if let Some(grown) = self.grow_path_to(index, neighbor, direction, &content) {
                    self.frontier.push_back(grown);
                }
            }
        }

        self.tiles.iter().all(PathTile::has_path)
    }

    fn grow_path_to<F>(
        &mut self,
        from: usize,
        neighbor: Option<usize>,
        direction: Direction,
        content: &F,
    ) -> Option<usize>
    where
        F: Fn(usize) -> ContentKind,
    {
        let neighbor = neighbor?;
        if self.tiles[neighbor].has_path() {
            return None;
        }

        let distance = self.tiles[from].distance + 1;
        let tile = &mut self.tiles[neighbor];
        tile.distance = distance;
        tile.next = Some(from);
        tile.direction = Some(direction);
        tile.exit_point = tile.center + direction.half_vector();

        if content(neighbor).blocks_path() {
            None
        } else {
            Some(neighbor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_are_paired_both_ways() {
        let graph = TileGraph::new(3, 2);
        let corner = graph.tile(0);
        assert_eq!(corner.east, Some(1));
        assert_eq!(corner.north, Some(3));
        assert_eq!(corner.west, None);
        assert_eq!(corner.south, None);
        assert_eq!(graph.tile(1).west, Some(0));
        assert_eq!(graph.tile(3).south, Some(0));
    }

    #[test]
    #[should_panic(expected = "redefined east-west neighbors")]
    fn relinking_neighbors_panics() {
        let mut graph = TileGraph::new(2, 1);
        graph.link_east_west(1, 0);
    }

    #[test]
    fn board_is_centered_on_origin() {
        let graph = TileGraph::new(3, 3);
        assert_eq!(graph.tile(4).center(), Vec3::ZERO);
        assert_eq!(graph.tile(0).center(), Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(graph.tile(8).center(), Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn checkerboard_alternates() {
        let graph = TileGraph::new(2, 2);
        assert!(!graph.tile(0).alternative);
        assert!(graph.tile(1).alternative);
        assert!(graph.tile(2).alternative);
        assert!(!graph.tile(3).alternative);
    }

    #[test]
    fn search_without_destination_fails() {
        let mut graph = TileGraph::new(2, 2);
        assert!(!graph.compute_paths(|_| ContentKind::Empty));
        assert!(!graph.tile(0).has_path());
    }

    #[test]
    fn blocking_tiles_receive_paths_but_do_not_expand() {
        let mut graph = TileGraph::new(3, 1);
        let kinds = [ContentKind::Destination, ContentKind::Wall, ContentKind::Empty];

        assert!(!graph.compute_paths(|index| kinds[index]));
        assert_eq!(graph.tile(1).distance(), Some(1), "wall is reached");
        assert_eq!(graph.tile(1).direction(), Some(Direction::West));
        assert!(!graph.tile(2).has_path(), "nothing expands past the wall");
    }

    #[test]
    fn exit_points_sit_on_the_shared_edge() {
        let mut graph = TileGraph::new(2, 1);
        let kinds = [ContentKind::Empty, ContentKind::Destination];

        assert!(graph.compute_paths(|index| kinds[index]));
        let tile = graph.tile(0);
        assert_eq!(tile.next(), Some(1));
        assert_eq!(tile.direction(), Some(Direction::East));
        assert_eq!(tile.exit_point(), Vec3::ZERO);
        assert_eq!(graph.tile(1).exit_point(), graph.tile(1).center());
    }
}

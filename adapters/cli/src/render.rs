//! Plain-text board rendering.

use std::{collections::BTreeSet, fmt::Write as _};

use tile_defence_core::{ContentKind, Direction, TileCoord, TowerKind};
use tile_defence_system_enemies::EnemyView;
use tile_defence_system_tower_combat::Ordnance;
use tile_defence_world::{query, Board};

/// Draws the board with the northern row on top.
///
/// Empty tiles show the direction of their path, or `?` without one. Empty
/// tiles currently occupied by an enemy show `*`.
pub(crate) fn render_board(board: &Board, enemies: &EnemyView) -> String {
    let (columns, rows) = query::dimensions(board);
    let occupied: BTreeSet<TileCoord> = enemies.iter().map(|enemy| enemy.tile).collect();

    let mut output = String::with_capacity(((columns + 1) * rows) as usize);
    for row in (0..rows).rev() {
        for column in 0..columns {
            let tile = TileCoord::new(column, row);
            output.push(tile_glyph(board, tile, occupied.contains(&tile)));
        }
        output.push('\n');
    }
    output
}

fn tile_glyph(board: &Board, tile: TileCoord, occupied: bool) -> char {
    match query::content_at(board, tile) {
        Some(ContentKind::Destination) => 'D',
        Some(ContentKind::SpawnPoint) => 'S',
        Some(ContentKind::Wall) => '#',
        Some(ContentKind::Tower(TowerKind::Laser)) => 'L',
        Some(ContentKind::Tower(TowerKind::Mortar)) => 'M',
        Some(ContentKind::Empty) if occupied => '*',
        Some(ContentKind::Empty) => match query::path_direction(board, tile) {
            Some(Direction::North) => '^',
            Some(Direction::East) => '>',
            Some(Direction::South) => 'v',
            Some(Direction::West) => '<',
            None => '?',
        },
        None => ' ',
    }
}

/// One line summarising the towers on the board.
pub(crate) fn render_towers(board: &Board) -> String {
    let mut line = String::new();
    for tower in query::tower_view(board).iter() {
        let _ = write!(
            line,
            "{:?}@({},{}) {:?}; ",
            tower.kind,
            tower.tile.column(),
            tower.tile.row(),
            tower.state
        );
    }
    line.trim_end_matches("; ").to_owned()
}

/// Shells in flight and lingering explosions, one per line.
pub(crate) fn render_ordnance(ordnance: &Ordnance) -> String {
    let mut lines = String::new();
    for shell in ordnance.shells() {
        let position = shell.position();
        let _ = writeln!(
            lines,
            "shell ({:.2},{:.2},{:.2}) age {:.2}s",
            position.x,
            position.y,
            position.z,
            shell.age()
        );
    }
    for explosion in ordnance.explosions() {
        let position = explosion.position();
        let _ = writeln!(
            lines,
            "explosion ({:.2},{:.2}) radius {:.2} age {:.2}s",
            position.x,
            position.z,
            explosion.radius(),
            explosion.age()
        );
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::Command;
    use glam::Vec3;
    use tile_defence_system_enemies::Enemies;
    use tile_defence_system_tower_combat::{LaserConfig, MortarConfig, Shell};
    use tile_defence_system_tower_targeting::TargetAcquisition;
    use tile_defence_world::apply;

    fn board() -> Board {
        Board::with_tower_configs(3, 3, LaserConfig::default(), MortarConfig::default())
            .expect("valid board")
    }

    #[test]
    fn default_board_shows_paths_toward_the_center() {
        let board = board();
        assert_eq!(
            render_board(&board, &EnemyView::default()),
            "vvv\n>D<\nS^^\n",
            "corner tiles follow the checkerboard tie-break"
        );
    }

    #[test]
    fn content_and_towers_are_drawn() {
        let mut board = board();
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::ToggleWall {
                tile: TileCoord::new(2, 2),
            },
            &mut events,
        );
        apply(
            &mut board,
            Command::ToggleTower {
                tile: TileCoord::new(1, 0),
                kind: TowerKind::Mortar,
            },
            &mut events,
        );

        assert_eq!(render_board(&board, &EnemyView::default()), "vv#\n>D<\nSM^\n");
        assert_eq!(render_towers(&board), "Mortar@(1,0) Idle");
    }

    #[test]
    fn ordnance_lists_shells_then_explosions() {
        let mut ordnance = Ordnance::new();
        assert_eq!(render_ordnance(&ordnance), "");

        ordnance.launch(Shell::new(
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::ZERO,
            1.5,
            10.0,
        ));
        assert_eq!(render_ordnance(&ordnance), "shell (1.00,2.00,0.00) age 0.00s\n");

        let mut acquisition = TargetAcquisition::new(3);
        let mut hits = Vec::new();
        ordnance.game_update(1.0, &Enemies::new(), &mut acquisition, &mut hits);

        assert!(hits.is_empty(), "nobody stands in the blast");
        assert_eq!(
            render_ordnance(&ordnance),
            "explosion (1.00,0.00) radius 1.50 age 0.00s\n"
        );
    }
}

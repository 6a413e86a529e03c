use std::collections::HashMap;

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tile_defence_core::{
    Direction, EnemyFactoryId, EnemyKind, Event, FloatRange, LayerMask, PathField, PathStep,
    TargetField, TargetPoint, TileCoord,
};
use tile_defence_system_enemies::{
    Enemies, EnemyConfig, EnemyFactories, EnemyFactory, SpawnError,
};

/// Hand-written path over explicit tiles; the last tile is the destination.
struct Route {
    steps: HashMap<TileCoord, PathStep>,
}

impl Route {
    fn new(tiles: &[TileCoord]) -> Self {
        let center = |tile: TileCoord| Vec3::new(tile.column() as f32, 0.0, tile.row() as f32);
        let mut steps = HashMap::new();
        for (index, tile) in tiles.iter().enumerate() {
            let step = match tiles.get(index + 1) {
                Some(next) => {
                    let direction = direction_between(*tile, *next);
                    PathStep {
                        center: center(*tile),
                        exit_point: center(*tile) + direction.half_vector(),
                        direction: Some(direction),
                        next: Some(*next),
                    }
                }
                None => PathStep {
                    center: center(*tile),
                    exit_point: center(*tile),
                    direction: None,
                    next: None,
                },
            };
            let _ = steps.insert(*tile, step);
        }
        Self { steps }
    }
}

fn direction_between(from: TileCoord, to: TileCoord) -> Direction {
    if to.row() > from.row() {
        Direction::North
    } else if to.row() < from.row() {
        Direction::South
    } else if to.column() > from.column() {
        Direction::East
    } else {
        Direction::West
    }
}

impl PathField for Route {
    fn path_step(&self, tile: TileCoord) -> Option<PathStep> {
        self.steps.get(&tile).copied()
    }
}

fn factories(speed: f32, path_offset: f32) -> (EnemyFactories, EnemyFactoryId) {
    let config = EnemyConfig {
        speed: FloatRange::constant(speed),
        path_offset: FloatRange::constant(path_offset),
        ..EnemyConfig::default()
    };
    let factory = EnemyFactory::new(config, config, config).expect("valid tuning");
    let mut factories = EnemyFactories::new();
    let id = factories.register(factory);
    (factories, id)
}

fn corridor() -> Route {
    Route::new(&[
        TileCoord::new(0, 0),
        TileCoord::new(1, 0),
        TileCoord::new(2, 0),
        TileCoord::new(3, 0),
    ])
}

#[test]
fn straight_corridor_takes_one_second_per_tile() {
    let route = corridor();
    let (factories, factory) = factories(1.0, 0.0);
    let mut enemies = Enemies::new();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut events = Vec::new();

    let id = enemies
        .spawn(&factories, factory, EnemyKind::Medium, TileCoord::new(0, 0), &route, &mut rng)
        .expect("spawn tile has a path");

    for _ in 0..29 {
        enemies.game_update(0.1, &route, &mut events);
    }
    assert!(events.is_empty(), "half intro, two tiles and half outro take three seconds");
    let snapshot = *enemies.view().iter().next().expect("enemy still walking");
    assert_eq!(snapshot.tile, TileCoord::new(3, 0));
    assert!((snapshot.heading_degrees - 90.0).abs() < 1e-6, "heading east");

    for _ in 0..2 {
        enemies.game_update(0.1, &route, &mut events);
    }
    assert_eq!(events, vec![Event::EnemyReachedDestination { enemy: id }]);
    assert!(enemies.is_empty());
}

#[test]
fn turning_enemy_stays_on_its_lane() {
    let route = Route::new(&[
        TileCoord::new(0, 0),
        TileCoord::new(0, 1),
        TileCoord::new(1, 1),
        TileCoord::new(2, 1),
    ]);
    let (factories, factory) = factories(1.0, 0.2);
    let mut enemies = Enemies::new();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut events = Vec::new();

    let _ = enemies
        .spawn(&factories, factory, EnemyKind::Small, TileCoord::new(0, 0), &route, &mut rng)
        .expect("spawn tile has a path");

    let pivot = Vec3::new(0.5, 0.0, 0.5);
    let mut saw_turn = false;
    for _ in 0..200 {
        enemies.game_update(0.01, &route, &mut events);
        let Some(snapshot) = enemies.view().iter().next().copied() else {
            break;
        };
        if snapshot.tile == TileCoord::new(0, 1) && snapshot.heading_degrees > 0.0 {
            saw_turn = true;
            let radius = snapshot.position.distance(pivot);
            assert!(
                (radius - 0.3).abs() < 1e-3,
                "right turn arcs around the tile corner at 0.5 - offset, got {radius}"
            );
        }
    }
    assert!(saw_turn, "the enemy must have been observed mid-turn");
}

#[test]
fn defeated_enemies_are_recycled_and_ids_go_stale() {
    let route = corridor();
    let (factories, factory) = factories(1.0, 0.0);
    let mut enemies = Enemies::new();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut events = Vec::new();

    let first = enemies
        .spawn(&factories, factory, EnemyKind::Large, TileCoord::new(0, 0), &route, &mut rng)
        .expect("spawn tile has a path");
    let target = TargetPoint::new(first);
    let sample = enemies.resolve(target).expect("fresh enemy resolves");
    assert!((sample.position.y - 0.25).abs() < 1e-6, "hit point sits at a quarter of the scale");

    assert!(enemies.apply_damage(first, 150.0));
    assert!(enemies.resolve(target).is_none(), "dead enemies are no longer targets");

    enemies.game_update(0.1, &route, &mut events);
    assert_eq!(events, vec![Event::EnemyDefeated { enemy: first }]);
    assert!(enemies.is_empty());

    let second = enemies
        .spawn(&factories, factory, EnemyKind::Large, TileCoord::new(0, 0), &route, &mut rng)
        .expect("spawn tile has a path");
    assert_eq!(second.slot(), first.slot(), "slots are reused");
    assert_ne!(second, first);
    assert!(!enemies.apply_damage(first, 1.0), "stale ids are ignored");
    assert!(enemies.resolve(TargetPoint::new(second)).is_some());
}

#[test]
fn overlap_query_respects_radius_and_layers() {
    let route = corridor();
    let (factories, factory) = factories(1.0, 0.0);
    let mut enemies = Enemies::new();
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    let id = enemies
        .spawn(&factories, factory, EnemyKind::Medium, TileCoord::new(0, 0), &route, &mut rng)
        .expect("spawn tile has a path");
    let mut out = [TargetPoint::new(id); 4];

    let tower = Vec3::new(2.0, 0.0, 0.0);
    let top = tower + Vec3::Y * 3.0;
    assert_eq!(enemies.overlap_capsule(tower, top, 1.5, LayerMask::ENEMY, &mut out), 0);
    assert_eq!(enemies.overlap_capsule(tower, top, 2.0, LayerMask::ENEMY, &mut out), 1);
    assert_eq!(out[0], TargetPoint::new(id));
    assert_eq!(
        enemies.overlap_capsule(tower, top, 2.0, LayerMask::from_bits(1), &mut out),
        0,
        "other layers never see enemies"
    );
}

#[test]
fn spawning_requires_a_known_factory_and_a_path() {
    let route = corridor();
    let (factories, factory) = factories(1.0, 0.0);
    let mut enemies = Enemies::new();
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    assert_eq!(
        enemies.spawn(
            &factories,
            EnemyFactoryId::new(9),
            EnemyKind::Small,
            TileCoord::new(0, 0),
            &route,
            &mut rng
        ),
        Err(SpawnError::UnknownFactory(EnemyFactoryId::new(9)))
    );
    assert_eq!(
        enemies.spawn(&factories, factory, EnemyKind::Small, TileCoord::new(3, 0), &route, &mut rng),
        Err(SpawnError::NoPath(TileCoord::new(3, 0))),
        "destinations have nowhere to go"
    );
    assert!(enemies.is_empty());
}

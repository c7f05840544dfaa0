mod support;

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use transit_core::ecs::Bus;
use transit_core::grid::{CellKind, GridPos};
use transit_core::network::{Stop, TransitNetwork};
use transit_core::routing::PathfindingManager;
use transit_core::test_helpers::{corridor_city, crossing_city};

use support::agents::bus_entities;
use support::schedule::TickRunner;
use support::world::TestWorldBuilder;

fn crossing_pathfinder() -> PathfindingManager {
    let (grid, _) = crossing_city();
    PathfindingManager::new(Arc::new(grid), 64)
}

#[test]
fn identical_endpoints_return_a_single_waypoint() {
    let mut pf = crossing_pathfinder();
    let p = Vec2::new(160.0, 80.0);
    assert_eq!(&*pf.find_path(p, p), &[p]);
}

#[test]
fn random_queries_never_return_an_empty_path() {
    let mut pf = crossing_pathfinder();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let start = Vec2::new(rng.gen_range(-40.0..360.0), rng.gen_range(-40.0..360.0));
        let end = Vec2::new(rng.gen_range(-40.0..360.0), rng.gen_range(-40.0..360.0));
        let path = pf.find_path(start, end);
        assert!(!path.is_empty());
        assert_eq!(*path.last().unwrap(), end);
    }
}

#[test]
fn road_paths_turn_at_the_crossing() {
    let mut pf = crossing_pathfinder();
    let start = Vec2::new(16.0, 80.0);
    let end = Vec2::new(160.0, 256.0);
    let path = pf.find_path(start, end);
    // 9 cells east to the crossing, 11 cells south.
    assert_eq!(path.len(), 20);
    assert!(path.contains(&Vec2::new(160.0, 80.0)));
    for waypoint in path.iter() {
        assert!(pf.grid().is_road(pf.grid().world_to_cell(*waypoint)));
    }
}

#[test]
fn cache_is_keyed_by_exact_coordinates() {
    let mut pf = crossing_pathfinder();
    let start = Vec2::new(16.0, 80.0);
    pf.find_path(start, Vec2::new(288.0, 80.0));
    pf.find_path(start, Vec2::new(288.0, 80.0));
    assert_eq!(pf.searches_run(), 1);
    assert_eq!(pf.cache().hits(), 1);

    // Snaps to the same cells but is a different key.
    pf.find_path(start, Vec2::new(290.0, 81.0));
    assert_eq!(pf.searches_run(), 2);
    assert_eq!(pf.cache().len(), 2);
}

#[test]
fn cache_never_exceeds_its_capacity() {
    let (grid, _) = corridor_city();
    let mut pf = PathfindingManager::new(Arc::new(grid), 4);
    for x in 0..20 {
        pf.find_path(Vec2::new(0.0, 80.0), Vec2::new(x as f32 * 16.0, 80.0));
        assert!(pf.cache().len() <= 4);
    }
    assert_eq!(pf.cache().capacity(), 4);
}

#[test]
fn isolated_road_cell_gets_a_direct_path() {
    let (mut grid, _) = corridor_city();
    grid.set(GridPos::new(5, 8), CellKind::Road);
    let mut pf = PathfindingManager::new(Arc::new(grid), 16);
    let end = Vec2::new(80.0, 128.0);
    assert_eq!(&*pf.find_path(Vec2::new(16.0, 80.0), end), &[end]);
    assert_eq!(pf.fallbacks(), 1);

    let back = Vec2::new(16.0, 80.0);
    assert_eq!(&*pf.find_path(end, back), &[back]);
    assert_eq!(pf.fallbacks(), 2);
}

#[test]
fn off_map_endpoints_fall_back() {
    let mut pf = crossing_pathfinder();
    let end = Vec2::new(-200.0, 80.0);
    assert_eq!(&*pf.find_path(Vec2::new(16.0, 80.0), end), &[end]);
    assert_eq!(pf.fallbacks(), 1);
    assert_eq!(pf.searches_run(), 0);
}

#[test]
fn bus_serves_an_isolated_stop() {
    let (mut grid, zones) = corridor_city();
    grid.set(GridPos::new(5, 8), CellKind::Road);
    let mut world = TestWorldBuilder::on(grid, zones)
        .with_route(&[(1, 5), (5, 8)])
        .build();
    let mut runner = TickRunner::new();
    let bus = bus_entities(&world, 0)[0];

    let mut served: HashSet<Stop> = HashSet::new();
    runner
        .run_until(&mut world, 2_000, |w| {
            let b = w.get::<Bus>(bus).expect("bus");
            if b.dwelling {
                let route = &w.resource::<TransitNetwork>().routes()[0];
                served.insert(route.stops[b.target_stop]);
            }
            served.len() == 2 && b.stop_visits >= 3
        })
        .expect("bus keeps looping");

    assert!(served.contains(&Stop::new(5, 8)));
    assert!(world.resource::<PathfindingManager>().fallbacks() >= 2);
}

#[test]
fn looping_bus_reuses_its_cached_legs() {
    let mut world = TestWorldBuilder::corridor()
        .with_route(&[(1, 5), (18, 5)])
        .build();
    let mut runner = TickRunner::new();
    let bus = bus_entities(&world, 0)[0];

    runner
        .run_until(&mut world, 5_000, |w| {
            w.get::<Bus>(bus).map_or(false, |b| b.stop_visits >= 8)
        })
        .expect("bus keeps looping");

    // One search per direction; every later visit is a cache hit.
    let pathfinder = world.resource::<PathfindingManager>();
    assert!(pathfinder.searches_run() <= 2, "ran {} searches", pathfinder.searches_run());
    assert!(pathfinder.cache().len() <= 2);
    assert!(pathfinder.cache().hits() > 0);
}

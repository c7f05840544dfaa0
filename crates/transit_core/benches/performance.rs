//! Performance benchmarks for transit_core using Criterion.rs.

use std::sync::Arc;

use bevy_ecs::prelude::World;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use transit_core::grid::{GridPos, RoadGrid, Zone, ZoneKind};
use transit_core::network::{Route, Stop};
use transit_core::planner::{RoutePlanner, StopGraph};
use transit_core::routing::PathfindingManager;
use transit_core::runner::{run_ticks, simulation_schedule};
use transit_core::scenario::{build_scenario, ScenarioParams, SimConfig};
use transit_core::topology::{add_bus, add_route};

/// Square city with a road every sixth line and a zone in each block.
fn block_city(size: i32) -> (RoadGrid, Vec<Zone>) {
    let mut grid = RoadGrid::new(size, size, 16.0);
    for line in (0..size).step_by(6) {
        grid.paint_road(GridPos::new(0, line), GridPos::new(size - 1, line));
        grid.paint_road(GridPos::new(line, 0), GridPos::new(line, size - 1));
    }
    let kinds = [ZoneKind::Residential, ZoneKind::Commercial, ZoneKind::Industrial];
    let mut zones = Vec::new();
    for (i, bx) in (0..size - 6).step_by(12).enumerate() {
        for (j, by) in (0..size - 6).step_by(12).enumerate() {
            zones.push(Zone::new(
                kinds[(i + j) % kinds.len()],
                format!("block {i}-{j}"),
                GridPos::new(bx + 1, by + 1),
                4,
                4,
            ));
        }
    }
    for zone in &zones {
        zone.paint(&mut grid);
    }
    (grid, zones)
}

fn line_routes(size: i32) -> Vec<Vec<Stop>> {
    let mut routes = Vec::new();
    for line in (6..size - 6).step_by(12) {
        routes.push((0..size).step_by(6).map(|x| Stop::new(x, line)).collect());
        routes.push((0..size).step_by(6).map(|y| Stop::new(line, y)).collect());
    }
    routes
}

fn bench_simulation_ticks(c: &mut Criterion) {
    let scenarios = vec![("small", 36, 50), ("medium", 60, 200), ("large", 96, 500)];

    let mut group = c.benchmark_group("simulation_ticks");
    group.sample_size(10);
    for (name, size, passengers) in scenarios {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(size, passengers),
            |b, &(size, passengers)| {
                b.iter(|| {
                    let (grid, zones) = block_city(size);
                    let config = SimConfig::default()
                        .with_max_npcs(passengers)
                        .with_spawn_interval_secs(0.05)
                        .with_max_traffic(passengers / 4);
                    let mut world = World::new();
                    build_scenario(
                        &mut world,
                        ScenarioParams::new(grid, zones)
                            .with_config(config)
                            .with_seed(42),
                    );
                    for stops in line_routes(size) {
                        if let Ok(route) = add_route(&mut world, stops, None) {
                            let _ = add_bus(&mut world, route);
                        }
                    }
                    let mut schedule = simulation_schedule();
                    black_box(run_ticks(&mut world, &mut schedule, 1_000, 0.1));
                });
            },
        );
    }
    group.finish();
}

fn bench_pathfinding(c: &mut Criterion) {
    let (grid, _) = block_city(96);
    let start = Vec2::new(0.0, 0.0);
    let end = Vec2::new(95.0 * 16.0, 90.0 * 16.0);

    let mut group = c.benchmark_group("pathfinding");
    group.bench_function("uncached_96x96", |b| {
        let mut pathfinder = PathfindingManager::new(Arc::new(grid.clone()), 1_000);
        b.iter(|| {
            pathfinder.clear_cache();
            black_box(pathfinder.find_path(start, end));
        });
    });
    group.bench_function("cached_96x96", |b| {
        let mut pathfinder = PathfindingManager::new(Arc::new(grid.clone()), 1_000);
        pathfinder.find_path(start, end);
        b.iter(|| black_box(pathfinder.find_path(start, end)));
    });
    group.finish();
}

fn bench_planner(c: &mut Criterion) {
    let routes: Vec<Route> = line_routes(96)
        .into_iter()
        .enumerate()
        .map(|(i, stops)| Route {
            name: format!("Route {}", i + 1),
            color: [0, 0, 0],
            stops,
            buses: Vec::new(),
            ridership: 0,
        })
        .collect();
    let origin = Stop::new(0, 6);
    let destination = Stop::new(90, 78);

    let mut group = c.benchmark_group("planner");
    group.bench_function("plan_trip_with_graph_build", |b| {
        b.iter(|| black_box(RoutePlanner.plan_trip(origin, destination, &routes)));
    });
    let graph = StopGraph::build(&routes);
    group.bench_function("plan_on_prebuilt_graph", |b| {
        b.iter(|| black_box(RoutePlanner.plan_on_graph(&graph, origin, destination)));
    });
    group.finish();
}

criterion_group!(benches, bench_simulation_ticks, bench_pathfinding, bench_planner);
criterion_main!(benches);

//! Test helpers: small hand-built cities and pre-wired worlds.
//!
//! Fixtures disable automatic passenger spawning and ambient traffic so tests
//! control every agent explicitly. Re-enable them through [`SimConfig`] when a
//! test wants the full population.

use bevy_ecs::prelude::World;

use crate::grid::{GridPos, RoadGrid, Zone, ZoneKind};
use crate::scenario::{build_scenario, ScenarioParams, SimConfig};

/// Cell size used by every fixture.
pub const TEST_CELL_SIZE: f32 = 16.0;

/// Seed used by every fixture.
pub const TEST_SEED: u64 = 7;

/// Config with spawning and traffic switched off.
pub fn quiet_config() -> SimConfig {
    SimConfig::default().with_max_npcs(0).with_max_traffic(0)
}

/// A 20x10 grid with one east-west street on `y = 5`.
///
/// Zone 0 is residential at x 0..=3, y 2..=4; zone 1 is commercial at
/// x 15..=18, y 2..=4. Both sit directly above the street. Natural stops are
/// `(1, 5)` and `(18, 5)`.
pub fn corridor_city() -> (RoadGrid, Vec<Zone>) {
    let mut grid = RoadGrid::new(20, 10, TEST_CELL_SIZE);
    grid.paint_road(GridPos::new(0, 5), GridPos::new(19, 5));
    let zones = vec![
        Zone::new(ZoneKind::Residential, "homes", GridPos::new(0, 2), 4, 3),
        Zone::new(ZoneKind::Commercial, "shops", GridPos::new(15, 2), 4, 3),
    ];
    for zone in &zones {
        zone.paint(&mut grid);
    }
    (grid, zones)
}

/// A 20x20 grid with a street on `y = 5` and one on `x = 10`, crossing at
/// `(10, 5)`.
///
/// Zone 0 is residential west of the crossing (x 0..=3, y 2..=4), zone 1 is
/// commercial south of it (x 11..=13, y 15..=17), zone 2 is industrial
/// at the east end (x 16..=19, y 2..=4).
pub fn crossing_city() -> (RoadGrid, Vec<Zone>) {
    let mut grid = RoadGrid::new(20, 20, TEST_CELL_SIZE);
    grid.paint_road(GridPos::new(0, 5), GridPos::new(19, 5));
    grid.paint_road(GridPos::new(10, 0), GridPos::new(10, 19));
    let zones = vec![
        Zone::new(ZoneKind::Residential, "west", GridPos::new(0, 2), 4, 3),
        Zone::new(ZoneKind::Commercial, "south", GridPos::new(11, 15), 3, 3),
        Zone::new(ZoneKind::Industrial, "east", GridPos::new(16, 2), 4, 3),
    ];
    for zone in &zones {
        zone.paint(&mut grid);
    }
    (grid, zones)
}

pub fn world_from(grid: RoadGrid, zones: Vec<Zone>, config: SimConfig) -> World {
    let mut world = World::new();
    build_scenario(
        &mut world,
        ScenarioParams::new(grid, zones)
            .with_config(config)
            .with_seed(TEST_SEED),
    );
    world
}

/// Corridor world with no routes yet.
pub fn corridor_world() -> World {
    let (grid, zones) = corridor_city();
    world_from(grid, zones, quiet_config())
}

/// Crossing world with no routes yet.
pub fn crossing_world() -> World {
    let (grid, zones) = crossing_city();
    world_from(grid, zones, quiet_config())
}

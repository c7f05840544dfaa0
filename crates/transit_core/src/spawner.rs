//! Passenger spawn policy: which zones a trip connects and where on the
//! street the passenger appears.

pub mod weighting;

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::grid::{GridPos, RoadGrid, Zone};
use crate::spatial::SpatialIndex;

/// Seeded RNG shared by spawning and ambient traffic.
#[derive(Debug, Resource)]
pub struct SimRng(pub StdRng);

/// Countdown and id allocation for passenger spawning.
#[derive(Debug, Default, Resource)]
pub struct NpcSpawner {
    /// Seconds until the next automatic spawn.
    pub until_next: f32,
    next_id: u64,
    pub spawned: u64,
}

impl NpcSpawner {
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.spawned += 1;
        id
    }

    /// Count down by `dt`; returns `true` when a spawn is due and re-arms the
    /// timer with `interval`.
    pub fn tick(&mut self, dt: f32, interval: f32) -> bool {
        self.until_next -= dt;
        if self.until_next > 0.0 {
            return false;
        }
        self.until_next += interval.max(f32::EPSILON);
        if self.until_next < 0.0 {
            self.until_next = interval;
        }
        true
    }
}

/// Road cells touching the zone's outer edge.
pub fn road_cells_around(grid: &RoadGrid, zone: &Zone) -> Vec<GridPos> {
    let mut cells: Vec<GridPos> = zone
        .perimeter_neighbors()
        .into_iter()
        .filter(|c| grid.is_road(*c))
        .collect();
    cells.sort();
    cells.dedup();
    cells
}

/// Where a passenger leaving `zone` appears.
///
/// With stops on the map, the road cell around the zone that is farthest from
/// its nearest stop is used, so new passengers have a walk ahead of them.
/// Without stops a random adjacent road cell is used, and with no adjacent road
/// the zone centroid.
pub fn spawn_point<R: Rng + ?Sized>(
    rng: &mut R,
    grid: &RoadGrid,
    zone: &Zone,
    index: &SpatialIndex,
) -> Vec2 {
    let candidates = road_cells_around(grid, zone);
    if !index.is_empty() {
        let farthest = candidates
            .iter()
            .filter_map(|c| {
                let at = grid.cell_to_world(*c);
                let stop = index.find_nearest_stop(at)?;
                Some((at, stop.world(grid).distance(at)))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((at, _)) = farthest {
            return grid.clamp_to_bounds(at);
        }
    }
    match candidates.choose(rng) {
        Some(cell) => grid.clamp_to_bounds(grid.cell_to_world(*cell)),
        None => zone.centroid(grid),
    }
}

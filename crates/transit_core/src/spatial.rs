//! Spatial index of stops: cell → stops multimap with a ring-expanding
//! nearest-stop search.
//!
//! The index is rebuilt wholesale from the current routes after every topology
//! edit. Stops are keyed by coordinates, so moving one is a delete plus insert
//! and a full rebuild is the simplest way to keep that consistent.
//!
//! [`SpatialIndex::find_nearest_stop`] is an approximate nearest neighbour: it
//! returns the Euclidean-closest stop among those in the first Chebyshev ring
//! that contains any stop. A stop one ring further out can occasionally be
//! closer than a stop near the corner of the current ring.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use glam::Vec2;

use crate::grid::GridPos;
use crate::network::{Route, Stop};

#[derive(Debug, Resource)]
pub struct SpatialIndex {
    width: i32,
    height: i32,
    cell_size: f32,
    /// Map from cell to the stops located there (one entry per route using it).
    stops_by_cell: HashMap<GridPos, Vec<Stop>>,
    rebuilds: u64,
}

impl SpatialIndex {
    pub fn new(width: i32, height: i32, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size,
            stops_by_cell: HashMap::new(),
            rebuilds: 0,
        }
    }

    /// Clear and repopulate from the given routes.
    pub fn rebuild_index(&mut self, routes: &[Route]) {
        self.stops_by_cell.clear();
        for route in routes {
            for stop in &route.stops {
                self.stops_by_cell
                    .entry(stop.cell())
                    .or_insert_with(Vec::new)
                    .push(*stop);
            }
        }
        self.rebuilds += 1;
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn is_empty(&self) -> bool {
        self.stops_by_cell.is_empty()
    }

    pub fn stops_in_cell(&self, cell: GridPos) -> &[Stop] {
        self.stops_by_cell
            .get(&cell)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn in_bounds(&self, cell: GridPos) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn stop_world(&self, stop: Stop) -> Vec2 {
        Vec2::new(stop.x as f32, stop.y as f32) * self.cell_size
    }

    /// Nearest stop to a world point, or `None` when the point is off the map
    /// or no stop exists.
    pub fn find_nearest_stop(&self, point: Vec2) -> Option<Stop> {
        let scaled = point / self.cell_size;
        let centre = GridPos::new(scaled.x.round() as i32, scaled.y.round() as i32);
        if !self.in_bounds(centre) || self.stops_by_cell.is_empty() {
            return None;
        }

        let max_radius = ((self.width * self.width + self.height * self.height) as f32)
            .sqrt()
            .ceil() as i32;
        let mut candidates: Vec<Stop> = Vec::new();
        for radius in 0..=max_radius {
            for cell in ring_cells(centre, radius) {
                if self.in_bounds(cell) {
                    candidates.extend_from_slice(self.stops_in_cell(cell));
                }
            }
            if !candidates.is_empty() {
                break;
            }
        }

        let mut best: Option<(Stop, f32)> = None;
        for stop in candidates {
            let d = self.stop_world(stop).distance_squared(point);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((stop, d));
            }
        }
        best.map(|(stop, _)| stop)
    }
}

/// Cells on the perimeter of the Chebyshev square of `radius` around `centre`.
fn ring_cells(centre: GridPos, radius: i32) -> Vec<GridPos> {
    if radius == 0 {
        return vec![centre];
    }
    let mut cells = Vec::with_capacity((8 * radius) as usize);
    for x in centre.x - radius..=centre.x + radius {
        cells.push(GridPos::new(x, centre.y - radius));
        cells.push(GridPos::new(x, centre.y + radius));
    }
    for y in centre.y - radius + 1..centre.y + radius {
        cells.push(GridPos::new(centre.x - radius, y));
        cells.push(GridPos::new(centre.x + radius, y));
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(stops: &[(i32, i32)]) -> Route {
        Route {
            name: "t".into(),
            color: [0, 0, 0],
            stops: stops.iter().map(|&(x, y)| Stop::new(x, y)).collect(),
            buses: Vec::new(),
            ridership: 0,
        }
    }

    #[test]
    fn ring_perimeter_has_eight_r_cells() {
        for r in 1..5 {
            assert_eq!(ring_cells(GridPos::new(0, 0), r).len(), (8 * r) as usize);
        }
    }

    #[test]
    fn finds_stop_in_same_cell() {
        let mut index = SpatialIndex::new(20, 20, 10.0);
        index.rebuild_index(&[route(&[(3, 3), (10, 10)])]);
        assert_eq!(
            index.find_nearest_stop(Vec2::new(31.0, 29.0)),
            Some(Stop::new(3, 3))
        );
    }

    #[test]
    fn ties_in_a_ring_resolve_by_euclidean_distance() {
        let mut index = SpatialIndex::new(20, 20, 10.0);
        index.rebuild_index(&[route(&[(8, 5), (5, 8)])]);
        // Both sit in ring 3 of (5,5); (5,8) is geometrically closer.
        assert_eq!(
            index.find_nearest_stop(Vec2::new(50.0, 52.0)),
            Some(Stop::new(5, 8))
        );
    }

    #[test]
    fn ring_boundary_approximation_is_preserved() {
        let mut index = SpatialIndex::new(20, 20, 10.0);
        // Query rounds to (5,5): the corner stop (7,3) is ring 2, (5,8) is ring 3,
        // yet the query point sits closer to (5,8).
        index.rebuild_index(&[route(&[(7, 3), (5, 8)])]);
        let query = Vec2::new(50.0, 54.5);
        let found = index.find_nearest_stop(query).unwrap();
        assert_eq!(found, Stop::new(7, 3));
        let d_found = Vec2::new(70.0, 30.0).distance(query);
        let d_other = Vec2::new(50.0, 80.0).distance(query);
        assert!(d_other < d_found);
    }

    #[test]
    fn out_of_bounds_or_empty_returns_none() {
        let mut index = SpatialIndex::new(10, 10, 10.0);
        assert_eq!(index.find_nearest_stop(Vec2::new(5.0, 5.0)), None);
        index.rebuild_index(&[route(&[(1, 1), (2, 2)])]);
        assert_eq!(index.find_nearest_stop(Vec2::new(-30.0, 5.0)), None);
        assert_eq!(index.find_nearest_stop(Vec2::new(5.0, 500.0)), None);
    }

    #[test]
    fn rebuild_drops_moved_stops() {
        let mut index = SpatialIndex::new(10, 10, 10.0);
        index.rebuild_index(&[route(&[(1, 1), (8, 8)])]);
        index.rebuild_index(&[route(&[(2, 1), (8, 8)])]);
        assert!(index.stops_in_cell(GridPos::new(1, 1)).is_empty());
        assert_eq!(index.stops_in_cell(GridPos::new(2, 1)), &[Stop::new(2, 1)]);
    }
}

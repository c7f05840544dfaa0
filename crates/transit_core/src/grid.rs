//! Static city layout: the road grid and zone list produced by city generation.
//!
//! The core only ever reads these. Continuous world positions map onto cells
//! through a fixed cell size: cell `(x, y)` is centred on `(x * size, y * size)`,
//! so converting a position back to a cell is a plain rounding.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Road,
    Residential,
    Commercial,
    Industrial,
}

/// Discrete grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 4-connected neighbours in up, right, down, left order.
    pub fn neighbors4(self) -> [GridPos; 4] {
        [
            GridPos::new(self.x, self.y - 1),
            GridPos::new(self.x + 1, self.y),
            GridPos::new(self.x, self.y + 1),
            GridPos::new(self.x - 1, self.y),
        ]
    }

    pub fn chebyshev(self, other: GridPos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadGrid {
    width: i32,
    height: i32,
    cell_size: f32,
    cells: Vec<CellKind>,
}

impl RoadGrid {
    /// An all-empty grid.
    pub fn new(width: i32, height: i32, cell_size: f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cell_size,
            cells: vec![CellKind::Empty; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn offset(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn get(&self, pos: GridPos) -> Option<CellKind> {
        self.offset(pos).map(|i| self.cells[i])
    }

    pub fn set(&mut self, pos: GridPos, kind: CellKind) {
        if let Some(i) = self.offset(pos) {
            self.cells[i] = kind;
        }
    }

    pub fn is_road(&self, pos: GridPos) -> bool {
        self.get(pos) == Some(CellKind::Road)
    }

    /// Lay a straight road between two cells (inclusive). Only axis-aligned
    /// segments are supported; diagonal requests draw an L (horizontal first).
    pub fn paint_road(&mut self, from: GridPos, to: GridPos) {
        let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
        for x in x0..=x1 {
            self.set(GridPos::new(x, from.y), CellKind::Road);
        }
        let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
        for y in y0..=y1 {
            self.set(GridPos::new(to.x, y), CellKind::Road);
        }
    }

    pub fn road_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .map(move |x| GridPos::new(x, y))
                .filter(move |p| self.is_road(*p))
        })
    }

    pub fn cell_to_world(&self, pos: GridPos) -> Vec2 {
        Vec2::new(pos.x as f32, pos.y as f32) * self.cell_size
    }

    /// Nearest cell to a world position. May be out of bounds.
    pub fn world_to_cell(&self, point: Vec2) -> GridPos {
        let scaled = point / self.cell_size;
        GridPos::new(scaled.x.round() as i32, scaled.y.round() as i32)
    }

    pub fn clamp_to_bounds(&self, point: Vec2) -> Vec2 {
        let max = Vec2::new(
            (self.width - 1) as f32 * self.cell_size,
            (self.height - 1) as f32 * self.cell_size,
        );
        point.clamp(Vec2::ZERO, max)
    }

    /// Length of the grid diagonal, in cells, rounded up.
    pub fn diagonal_cells(&self) -> i32 {
        ((self.width * self.width + self.height * self.height) as f32)
            .sqrt()
            .ceil() as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Residential,
    Commercial,
    Industrial,
}

impl ZoneKind {
    pub fn cell_kind(self) -> CellKind {
        match self {
            ZoneKind::Residential => CellKind::Residential,
            ZoneKind::Commercial => CellKind::Commercial,
            ZoneKind::Industrial => CellKind::Industrial,
        }
    }
}

/// Axis-aligned rectangle of cells with a land-use kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub name: String,
    pub origin: GridPos,
    pub width: i32,
    pub height: i32,
}

impl Zone {
    pub fn new(kind: ZoneKind, name: impl Into<String>, origin: GridPos, width: i32, height: i32) -> Self {
        Self {
            kind,
            name: name.into(),
            origin,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= self.origin.x
            && pos.y >= self.origin.y
            && pos.x < self.origin.x + self.width
            && pos.y < self.origin.y + self.height
    }

    /// Centre of the zone in world coordinates, clamped to the map.
    pub fn centroid(&self, grid: &RoadGrid) -> Vec2 {
        let centre = Vec2::new(
            self.origin.x as f32 + (self.width - 1) as f32 * 0.5,
            self.origin.y as f32 + (self.height - 1) as f32 * 0.5,
        ) * grid.cell_size();
        grid.clamp_to_bounds(centre)
    }

    /// Cells outside the zone that share an edge with one of its border cells.
    pub fn perimeter_neighbors(&self) -> Vec<GridPos> {
        let mut out = Vec::new();
        for x in self.origin.x..self.origin.x + self.width {
            out.push(GridPos::new(x, self.origin.y - 1));
            out.push(GridPos::new(x, self.origin.y + self.height));
        }
        for y in self.origin.y..self.origin.y + self.height {
            out.push(GridPos::new(self.origin.x - 1, y));
            out.push(GridPos::new(self.origin.x + self.width, y));
        }
        out
    }

    /// Stamp the zone's cells into a grid.
    pub fn paint(&self, grid: &mut RoadGrid) {
        for y in self.origin.y..self.origin.y + self.height {
            for x in self.origin.x..self.origin.x + self.width {
                grid.set(GridPos::new(x, y), self.kind.cell_kind());
            }
        }
    }
}

/// Read-only city input shared with the renderer through snapshots.
#[derive(Debug, Clone, Resource)]
pub struct CityMap {
    pub grid: Arc<RoadGrid>,
    pub zones: Arc<Vec<Zone>>,
}

impl CityMap {
    pub fn new(grid: RoadGrid, zones: Vec<Zone>) -> Self {
        Self {
            grid: Arc::new(grid),
            zones: Arc::new(zones),
        }
    }

    pub fn zone(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }
}

//! Grid pathfinding over road cells with an LRU-backed path cache.
//!
//! [`PathfindingManager::find_path`] runs a 4-connected breadth-first search
//! between the cells nearest the requested endpoints and returns world-space
//! waypoints. The last waypoint is always the exact requested end point, and a
//! disconnected road graph degrades to a direct single-waypoint path instead of
//! failing the caller.
//!
//! The cache is owned by the manager instance (no process-wide state) and is
//! keyed by the exact coordinate pair, so two queries that snap to the same
//! cells but differ in their raw points are cached separately.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use lru::LruCache;
use pathfinding::prelude::bfs;
use tracing::debug;

use crate::grid::{GridPos, RoadGrid};

/// Default number of cached paths.
pub const DEFAULT_PATH_CACHE_CAPACITY: usize = 1_000;

/// Exact-coordinate cache key (bit patterns, so `-0.0` and `0.0` differ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathKey([u32; 4]);

impl PathKey {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self([
            start.x.to_bits(),
            start.y.to_bits(),
            end.x.to_bits(),
            end.y.to_bits(),
        ])
    }
}

/// Bounded least-recently-used store of computed paths.
#[derive(Debug)]
pub struct PathCache {
    cache: LruCache<PathKey, Arc<[Vec2]>>,
    hits: u64,
    misses: u64,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a path, marking it most recently used.
    pub fn get(&mut self, key: &PathKey) -> Option<Arc<[Vec2]>> {
        match self.cache.get(key) {
            Some(path) => {
                self.hits += 1;
                Some(Arc::clone(path))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a path, evicting the least recently used entry when full.
    pub fn put(&mut self, key: PathKey, path: Arc<[Vec2]>) {
        self.cache.put(key, path);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.cache.contains(key)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Road-network pathfinder. Owns the grid handle and its cache.
#[derive(Debug, Resource)]
pub struct PathfindingManager {
    grid: Arc<RoadGrid>,
    cache: PathCache,
    searches_run: u64,
    fallbacks: u64,
}

impl PathfindingManager {
    pub fn new(grid: Arc<RoadGrid>, cache_capacity: usize) -> Self {
        Self {
            grid,
            cache: PathCache::new(cache_capacity),
            searches_run: 0,
            fallbacks: 0,
        }
    }

    pub fn grid(&self) -> &RoadGrid {
        &self.grid
    }

    /// Swap in a new road grid. Every cached path is invalidated.
    pub fn replace_grid(&mut self, grid: Arc<RoadGrid>) {
        self.grid = grid;
        self.cache.clear();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Number of breadth-first searches actually executed (cache misses that
    /// needed a search).
    pub fn searches_run(&self) -> u64 {
        self.searches_run
    }

    /// Number of searches that found no road connection.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Waypoints from `start` to `end`. Never empty; the last element is `end`.
    pub fn find_path(&mut self, start: Vec2, end: Vec2) -> Arc<[Vec2]> {
        let key = PathKey::new(start, end);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let path: Arc<[Vec2]> = self.compute_path(start, end).into();
        self.cache.put(key, Arc::clone(&path));
        path
    }

    fn compute_path(&mut self, start: Vec2, end: Vec2) -> Vec<Vec2> {
        let from = self.grid.world_to_cell(start);
        let to = self.grid.world_to_cell(end);
        if from == to {
            return vec![end];
        }
        if !self.grid.in_bounds(from) || !self.grid.in_bounds(to) {
            self.fallbacks += 1;
            return vec![end];
        }

        self.searches_run += 1;
        let grid = &self.grid;
        let cells = bfs(
            &from,
            |cell: &GridPos| {
                cell.neighbors4()
                    .into_iter()
                    .filter(|n| *n == to || grid.is_road(*n))
                    .collect::<Vec<_>>()
            },
            |cell| *cell == to,
        );

        match cells {
            Some(cells) => {
                let mut waypoints: Vec<Vec2> = cells
                    .iter()
                    .skip(1)
                    .map(|cell| grid.cell_to_world(*cell))
                    .collect();
                if let Some(last) = waypoints.last_mut() {
                    *last = end;
                }
                waypoints
            }
            None => {
                debug!(?from, ?to, "no road connection; using direct path");
                self.fallbacks += 1;
                vec![end]
            }
        }
    }
}

//! Route topology: stops, routes and the durable representation of both.
//!
//! A [`Stop`] is a plain coordinate value. Two routes referencing the same
//! cell share the stop; there is no separate stop identity to keep in sync.

use bevy_ecs::prelude::{Entity, Resource};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::grid::{GridPos, RoadGrid};

/// Minimum stops a route must keep.
pub const MIN_ROUTE_STOPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stop {
    pub x: i32,
    pub y: i32,
}

impl Stop {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn cell(self) -> GridPos {
        GridPos::new(self.x, self.y)
    }

    pub fn world(self, grid: &RoadGrid) -> Vec2 {
        grid.cell_to_world(self.cell())
    }
}

impl From<GridPos> for Stop {
    fn from(pos: GridPos) -> Self {
        Self::new(pos.x, pos.y)
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub color: [u8; 3],
    /// Cyclic: the stop after the last one is the first.
    pub stops: Vec<Stop>,
    /// Bus entities serving this route, in creation order.
    pub buses: Vec<Entity>,
    pub ridership: u64,
}

impl Route {
    pub fn serves(&self, stop: Stop) -> bool {
        self.stops.contains(&stop)
    }

    pub fn stop_at(&self, index: usize) -> Option<Stop> {
        if self.stops.is_empty() {
            return None;
        }
        self.stops.get(index % self.stops.len()).copied()
    }
}

/// Live route topology. Every edit bumps [`TransitNetwork::revision`].
#[derive(Debug, Default, Resource)]
pub struct TransitNetwork {
    routes: Vec<Route>,
    revision: u64,
}

impl TransitNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn route_mut(&mut self, index: usize) -> Result<&mut Route, TopologyError> {
        self.routes
            .get_mut(index)
            .ok_or(TopologyError::UnknownRoute(index))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn mark_changed(&mut self) {
        self.revision += 1;
    }

    pub fn push_route(&mut self, route: Route) -> usize {
        self.routes.push(route);
        self.mark_changed();
        self.routes.len() - 1
    }

    pub fn take_route(&mut self, index: usize) -> Result<Route, TopologyError> {
        if index >= self.routes.len() {
            return Err(TopologyError::UnknownRoute(index));
        }
        self.mark_changed();
        Ok(self.routes.remove(index))
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.mark_changed();
    }

    /// Count boardings against a route. Unknown indices are ignored.
    pub fn record_ridership(&mut self, route: usize, riders: u64) {
        if let Some(route) = self.routes.get_mut(route) {
            route.ridership += riders;
        }
    }

    pub fn total_buses(&self) -> usize {
        self.routes.iter().map(|r| r.buses.len()).sum()
    }

    pub fn all_stops(&self) -> impl Iterator<Item = Stop> + '_ {
        self.routes.iter().flat_map(|r| r.stops.iter().copied())
    }
}

/// One route as persisted between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub stops: Vec<Stop>,
    pub bus_count: usize,
    pub color: [u8; 3],
}

/// The only durable state: which routes exist. Agents are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTopology {
    pub routes: Vec<RouteRecord>,
}

impl RouteTopology {
    pub fn from_network(network: &TransitNetwork) -> Self {
        Self {
            routes: network
                .routes()
                .iter()
                .map(|r| RouteRecord {
                    stops: r.stops.clone(),
                    bus_count: r.buses.len(),
                    color: r.color,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, TopologyError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, TopologyError> {
        Ok(serde_json::from_str(raw)?)
    }
}

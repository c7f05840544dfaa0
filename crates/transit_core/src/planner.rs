//! Minimum-transfer trip planning over the stop graph.
//!
//! Every route contributes a clique: each of its stops is connected to every
//! other stop on it, regardless of direction or travel time. Routes that share
//! a stop meet there, which is where transfers happen. A breadth-first search
//! over that graph therefore minimises the number of legs.
//!
//! Plans are snapshots. They are not updated when routes change; callers detect
//! staleness when a plan no longer matches the bus in front of them.

use std::collections::HashMap;

use pathfinding::prelude::bfs;
use serde::{Deserialize, Serialize};

use crate::network::{Route, Stop};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    /// Origin, every transfer stop, then the destination.
    pub stops: Vec<Stop>,
    /// Route index for each leg; `routes.len() == stops.len() - 1`.
    pub routes: Vec<usize>,
    pub transfers: usize,
}

impl TransferPlan {
    fn trivial(stop: Stop) -> Self {
        Self {
            stops: vec![stop],
            routes: Vec::new(),
            transfers: 0,
        }
    }

    pub fn legs(&self) -> usize {
        self.routes.len()
    }

    pub fn origin(&self) -> Option<Stop> {
        self.stops.first().copied()
    }

    pub fn destination(&self) -> Option<Stop> {
        self.stops.last().copied()
    }
}

/// Undirected stop adjacency. Each neighbour is listed once, tagged with the
/// first route (lowest index) that connects the pair.
#[derive(Debug, Default)]
pub struct StopGraph {
    adjacency: HashMap<Stop, Vec<(Stop, usize)>>,
}

impl StopGraph {
    pub fn build(routes: &[Route]) -> Self {
        let mut adjacency: HashMap<Stop, Vec<(Stop, usize)>> = HashMap::new();
        for (route_index, route) in routes.iter().enumerate() {
            for &a in &route.stops {
                let edges = adjacency.entry(a).or_default();
                for &b in &route.stops {
                    if a != b && !edges.iter().any(|(s, _)| *s == b) {
                        edges.push((b, route_index));
                    }
                }
            }
        }
        Self { adjacency }
    }

    pub fn neighbors(&self, stop: Stop) -> &[(Stop, usize)] {
        self.adjacency.get(&stop).map(Vec::as_slice).unwrap_or(&[])
    }

    fn route_between(&self, a: Stop, b: Stop) -> Option<usize> {
        self.neighbors(a)
            .iter()
            .find(|(s, _)| *s == b)
            .map(|(_, r)| *r)
    }

    pub fn contains(&self, stop: Stop) -> bool {
        self.adjacency.contains_key(&stop)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RoutePlanner;

impl RoutePlanner {
    /// Fewest-legs plan from `origin` to `destination`, or `None` if unreachable.
    pub fn plan_trip(&self, origin: Stop, destination: Stop, routes: &[Route]) -> Option<TransferPlan> {
        if origin == destination {
            return Some(TransferPlan::trivial(origin));
        }
        let graph = StopGraph::build(routes);
        self.plan_on_graph(&graph, origin, destination)
    }

    pub fn plan_on_graph(&self, graph: &StopGraph, origin: Stop, destination: Stop) -> Option<TransferPlan> {
        if origin == destination {
            return Some(TransferPlan::trivial(origin));
        }
        if !graph.contains(origin) || !graph.contains(destination) {
            return None;
        }

        let stops = bfs(
            &origin,
            |stop: &Stop| graph.neighbors(*stop).iter().map(|(s, _)| *s).collect::<Vec<_>>(),
            |stop| *stop == destination,
        )?;
        let routes = stops
            .windows(2)
            .map(|pair| graph.route_between(pair[0], pair[1]))
            .collect::<Option<Vec<_>>>()?;
        let transfers = routes.len().saturating_sub(1);
        Some(TransferPlan {
            stops,
            routes,
            transfers,
        })
    }
}

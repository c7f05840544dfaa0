use thiserror::Error;

use crate::network::Stop;

/// Rejected topology edits. Simulation-time failures are recovered locally and
/// never surface here.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("route {0} does not exist")]
    UnknownRoute(usize),
    #[error("route {route} has no stop at index {index}")]
    UnknownStop { route: usize, index: usize },
    #[error("a route needs at least {min} stops, got {got}")]
    TooFewStops { min: usize, got: usize },
    #[error("stop ({}, {}) is not on a road cell", .0.x, .0.y)]
    NotOnRoad(Stop),
    #[error("route {route} already runs the maximum of {max} buses")]
    BusLimit { route: usize, max: usize },
    #[error("route {0} has no buses to remove")]
    NoBuses(usize),
    #[error("invalid topology data: {0}")]
    Decode(#[from] serde_json::Error),
}

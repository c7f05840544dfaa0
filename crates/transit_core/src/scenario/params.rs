use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::{DEFAULT_DAY_LENGTH_SECS, DEFAULT_MAX_FRAME_SECS};
use crate::grid::{RoadGrid, Zone};
use crate::routing::DEFAULT_PATH_CACHE_CAPACITY;
use crate::spawner::weighting::ZoneWeights;
use crate::steering::SteeringParams;
use crate::traffic::{RetargetParams, TrafficProfileKind};

/// Default world units per grid cell.
pub const DEFAULT_CELL_SIZE: f32 = 16.0;

/// Default fare charged once per completed ride.
pub const DEFAULT_TICKET_PRICE: f64 = 2.0;

/// Fare charged on arrival for riders who boarded at least once.
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct TicketPrice(pub f64);

impl Default for TicketPrice {
    fn default() -> Self {
        Self(DEFAULT_TICKET_PRICE)
    }
}

/// Every tunable of the simulation core.
#[derive(Debug, Clone, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SimConfig {
    pub path_cache_capacity: usize,
    /// Passenger walking speed, world units per second.
    pub walk_speed: f32,
    pub walk_arrival_threshold: f32,
    /// A stranded passenger farther than this from its re-acquired stop walks there.
    pub reacquire_walk_cells: f32,
    /// Waiting longer than this makes a passenger give up.
    pub max_wait_secs: f32,
    /// Maximum stop-to-destination-centroid distance, in cells.
    pub acceptance_radius_cells: f32,
    pub transfer_cap: u32,
    pub bus_capacity: usize,
    pub max_buses_per_route: usize,
    pub dwell_secs: f32,
    pub bus_steering: SteeringParams,
    pub traffic_steering: SteeringParams,
    pub congestion_radius: f32,
    pub congestion_per_vehicle: f32,
    pub congestion_max_slowdown: f32,
    /// Buses start decelerating this far from the stop.
    pub stop_approach_distance: f32,
    pub stop_approach_min_factor: f32,
    /// Ambient traffic population at density factor 1.0.
    pub max_traffic: usize,
    pub retarget: RetargetParams,
    /// Seconds between passenger spawns at demand factor 1.0.
    pub spawn_interval_secs: f32,
    /// Automatic spawning stops at this many live passengers.
    pub max_npcs: usize,
    pub zone_weights: ZoneWeights,
    pub utilization_sample_secs: f32,
    pub max_utilization_samples: usize,
    pub day_length_secs: f64,
    pub start_hour: f64,
    pub max_frame_secs: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY,
            walk_speed: 14.0,
            walk_arrival_threshold: 1.5,
            reacquire_walk_cells: 1.0,
            max_wait_secs: 120.0,
            acceptance_radius_cells: 8.0,
            transfer_cap: 3,
            bus_capacity: 10,
            max_buses_per_route: 10,
            dwell_secs: 1.5,
            bus_steering: SteeringParams::bus(),
            traffic_steering: SteeringParams::traffic(),
            congestion_radius: 48.0,
            congestion_per_vehicle: 0.08,
            congestion_max_slowdown: 0.5,
            stop_approach_distance: 32.0,
            stop_approach_min_factor: 0.25,
            max_traffic: 24,
            retarget: RetargetParams::default(),
            spawn_interval_secs: 3.0,
            max_npcs: 150,
            zone_weights: ZoneWeights::default(),
            utilization_sample_secs: 1.0,
            max_utilization_samples: 600,
            day_length_secs: DEFAULT_DAY_LENGTH_SECS,
            start_hour: 8.0,
            max_frame_secs: DEFAULT_MAX_FRAME_SECS,
        }
    }
}

impl SimConfig {
    pub fn with_max_wait_secs(mut self, secs: f32) -> Self {
        self.max_wait_secs = secs;
        self
    }

    pub fn with_transfer_cap(mut self, cap: u32) -> Self {
        self.transfer_cap = cap;
        self
    }

    pub fn with_max_traffic(mut self, count: usize) -> Self {
        self.max_traffic = count;
        self
    }

    pub fn with_max_npcs(mut self, count: usize) -> Self {
        self.max_npcs = count;
        self
    }

    pub fn with_spawn_interval_secs(mut self, secs: f32) -> Self {
        self.spawn_interval_secs = secs;
        self
    }

    pub fn with_dwell_secs(mut self, secs: f32) -> Self {
        self.dwell_secs = secs;
        self
    }

    pub fn acceptance_radius(&self, cell_size: f32) -> f32 {
        self.acceptance_radius_cells * cell_size
    }
}

/// Inputs for [`crate::scenario::build_scenario`].
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub config: SimConfig,
    pub seed: Option<u64>,
    pub grid: RoadGrid,
    pub zones: Vec<Zone>,
    pub ticket_price: f64,
    pub traffic_profile: TrafficProfileKind,
}

impl ScenarioParams {
    pub fn new(grid: RoadGrid, zones: Vec<Zone>) -> Self {
        Self {
            config: SimConfig::default(),
            seed: None,
            grid,
            zones,
            ticket_price: DEFAULT_TICKET_PRICE,
            traffic_profile: TrafficProfileKind::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ticket_price(mut self, price: f64) -> Self {
        self.ticket_price = price;
        self
    }

    pub fn with_traffic_profile(mut self, kind: TrafficProfileKind) -> Self {
        self.traffic_profile = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "transfer_cap": 1, "dwell_secs": 3.0 }"#).unwrap();
        assert_eq!(config.transfer_cap, 1);
        assert_eq!(config.dwell_secs, 3.0);
        assert_eq!(config.bus_capacity, SimConfig::default().bus_capacity);
    }
}

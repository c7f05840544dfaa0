use bevy_ecs::prelude::World;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::SimulationClock;
use crate::grid::CityMap;
use crate::network::TransitNetwork;
use crate::routing::PathfindingManager;
use crate::scenario::params::{ScenarioParams, TicketPrice};
use crate::spatial::SpatialIndex;
use crate::spawner::{NpcSpawner, SimRng};
use crate::telemetry::{LatestSnapshot, TransitStats};
use crate::traffic::TrafficProfile;

/// Insert every resource the tick schedule needs. Routes start empty; add them
/// with [`crate::topology::add_route`] or [`crate::topology::restore_topology`].
pub fn build_scenario(world: &mut World, params: ScenarioParams) {
    let ScenarioParams {
        config,
        seed,
        grid,
        zones,
        ticket_price,
        traffic_profile,
    } = params;

    let city = CityMap::new(grid, zones);
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    world.insert_resource(PathfindingManager::new(
        city.grid.clone(),
        config.path_cache_capacity,
    ));
    world.insert_resource(SpatialIndex::new(
        city.grid.width(),
        city.grid.height(),
        city.grid.cell_size(),
    ));
    world.insert_resource(SimulationClock::new(
        config.day_length_secs,
        config.start_hour,
        config.max_frame_secs,
    ));
    world.insert_resource(TransitNetwork::new());
    world.insert_resource(TrafficProfile::from_kind(&traffic_profile));
    world.insert_resource(TransitStats::new(config.max_utilization_samples));
    world.insert_resource(LatestSnapshot::default());
    world.insert_resource(NpcSpawner::default());
    world.insert_resource(SimRng(rng));
    world.insert_resource(TicketPrice(ticket_price));
    world.insert_resource(config);
    world.insert_resource(city);
}

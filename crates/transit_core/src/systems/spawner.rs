//! Spawn systems: passenger arrivals and the ambient traffic population.

use std::sync::Arc;

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut, With, World};
use bevy_ecs::system::SystemState;
use rand::seq::IteratorRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::clock::SimulationClock;
use crate::ecs::{Motion, Npc, Position, TrafficVehicle};
use crate::grid::CityMap;
use crate::routing::PathfindingManager;
use crate::scenario::SimConfig;
use crate::spatial::SpatialIndex;
use crate::spawner::{spawn_point, NpcSpawner, SimRng};
use crate::traffic::TrafficProfile;

/// Build a fresh passenger for the `origin -> destination` zone pair. The walk
/// leads to the stop nearest the spawn point, or nowhere if there are no stops.
#[allow(clippy::too_many_arguments)]
fn new_passenger<R: Rng + ?Sized>(
    rng: &mut R,
    city: &CityMap,
    index: &SpatialIndex,
    pathfinder: &mut PathfindingManager,
    spawner: &mut NpcSpawner,
    origin: usize,
    destination: usize,
    now: f64,
) -> Option<(Npc, Position)> {
    if origin == destination {
        return None;
    }
    let zone = city.zone(origin)?;
    city.zone(destination)?;

    let at = spawn_point(rng, &city.grid, zone, index);
    let walk: Arc<[glam::Vec2]> = match index.find_nearest_stop(at) {
        Some(stop) => pathfinder.find_path(at, stop.world(&city.grid)),
        None => Arc::from(vec![at]),
    };
    let id = spawner.allocate_id();
    trace!(id, origin, destination, "passenger spawned");
    Some((Npc::new(id, origin, destination, walk, now), Position(at)))
}

/// Spawns one passenger every `spawn_interval_secs / demand(hour)` seconds
/// while the live population is under `max_npcs`.
#[allow(clippy::too_many_arguments)]
pub fn npc_spawner_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    profile: Res<TrafficProfile>,
    city: Res<CityMap>,
    index: Res<SpatialIndex>,
    mut pathfinder: ResMut<PathfindingManager>,
    mut spawner: ResMut<NpcSpawner>,
    mut rng: ResMut<SimRng>,
    npcs: Query<(), With<Npc>>,
) {
    if npcs.iter().count() >= config.max_npcs {
        return;
    }
    let demand = profile.passenger_demand.factor_at(clock.hour_of_day());
    if demand <= 0.0 {
        return;
    }
    if !spawner.tick(clock.dt(), config.spawn_interval_secs / demand) {
        return;
    }
    let Some((origin, destination)) = config.zone_weights.choose_trip(&mut rng.0, &city.zones) else {
        return;
    };
    if let Some(bundle) = new_passenger(
        &mut rng.0,
        &city,
        &index,
        &mut pathfinder,
        &mut spawner,
        origin,
        destination,
        clock.now(),
    ) {
        commands.spawn(bundle);
    }
}

/// Spawn a passenger between two specific zones, outside the schedule.
/// Returns `None` for unknown or identical zones.
pub fn spawn_npc_between(world: &mut World, origin: usize, destination: usize) -> Option<Entity> {
    let mut state: SystemState<(
        Res<SimulationClock>,
        Res<CityMap>,
        Res<SpatialIndex>,
        ResMut<PathfindingManager>,
        ResMut<NpcSpawner>,
        ResMut<SimRng>,
    )> = SystemState::new(world);
    let bundle = {
        let (clock, city, index, mut pathfinder, mut spawner, mut rng) = state.get_mut(world);
        new_passenger(
            &mut rng.0,
            &city,
            &index,
            &mut pathfinder,
            &mut spawner,
            origin,
            destination,
            clock.now(),
        )?
    };
    Some(world.spawn(bundle).id())
}

/// Moves the traffic population one vehicle per tick toward
/// `max_traffic * density(hour)`. Stalled vehicles are retired first; any
/// stalled vehicle that is kept is moved to a random road cell.
#[allow(clippy::too_many_arguments)]
pub fn traffic_population_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    profile: Res<TrafficProfile>,
    city: Res<CityMap>,
    mut rng: ResMut<SimRng>,
    mut vehicles: Query<(Entity, &mut TrafficVehicle, &mut Position, &mut Motion)>,
) {
    let density = profile.traffic_density.factor_at(clock.hour_of_day()).max(0.0);
    let target = (config.max_traffic as f32 * density).round() as usize;
    let count = vehicles.iter().count();

    let mut retired = None;
    if count < target {
        if let Some(cell) = city.grid.road_cells().choose(&mut rng.0) {
            let heading = rng.0.gen_range(0..4) as f32 * std::f32::consts::FRAC_PI_2;
            commands.spawn((
                TrafficVehicle::default(),
                Position(city.grid.cell_to_world(cell)),
                Motion::idle(heading),
            ));
        }
    } else if count > target {
        retired = vehicles
            .iter()
            .find(|(_, v, _, _)| v.stalled)
            .or_else(|| vehicles.iter().next())
            .map(|(e, _, _, _)| e);
        if let Some(entity) = retired {
            debug!(?entity, count, target, "retiring traffic vehicle");
            commands.entity(entity).despawn();
        }
    }

    for (entity, mut vehicle, mut position, mut motion) in &mut vehicles {
        if !vehicle.stalled || retired == Some(entity) {
            continue;
        }
        let Some(cell) = city.grid.road_cells().choose(&mut rng.0) else {
            continue;
        };
        debug!(?entity, ?cell, "recycling stalled traffic vehicle");
        let heading = rng.0.gen_range(0..4) as f32 * std::f32::consts::FRAC_PI_2;
        *vehicle = TrafficVehicle::default();
        position.0 = city.grid.cell_to_world(cell);
        *motion = Motion::idle(heading);
    }
}

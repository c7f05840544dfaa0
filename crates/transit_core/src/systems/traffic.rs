//! Ambient traffic: follow the current path, re-target when it runs out.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut, With, Without};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{Bus, Motion, Position, TrafficVehicle};
use crate::grid::CityMap;
use crate::routing::PathfindingManager;
use crate::scenario::SimConfig;
use crate::spawner::SimRng;
use crate::steering::{steer, Obstacle};
use crate::traffic::choose_destination;

#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn traffic_movement_system(
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    city: Res<CityMap>,
    mut pathfinder: ResMut<PathfindingManager>,
    mut rng: ResMut<SimRng>,
    mut vehicles: Query<(Entity, &mut TrafficVehicle, &mut Position, &mut Motion), Without<Bus>>,
    buses: Query<(Entity, &Position, &Motion), With<Bus>>,
) {
    let dt = clock.dt();
    let grid = &city.grid;
    // Stalled vehicles are recycled by the population system and block nobody.
    let obstacles: Vec<Obstacle> = vehicles
        .iter()
        .filter(|(_, vehicle, _, _)| !vehicle.stalled)
        .map(|(entity, _, p, m)| (entity, p, m))
        .chain(buses.iter())
        .map(|(entity, position, motion)| Obstacle {
            entity,
            position: position.0,
            heading: motion.heading,
        })
        .collect();

    for (entity, mut vehicle, mut position, mut motion) in &mut vehicles {
        if motion.finished() {
            match choose_destination(&mut rng.0, grid, position.0, motion.heading, &config.retarget) {
                Some(cell) => {
                    motion.set_path(pathfinder.find_path(position.0, grid.cell_to_world(cell)));
                    vehicle.destination = Some(cell);
                    vehicle.stalled = false;
                }
                None => {
                    if !vehicle.stalled {
                        debug!(?entity, "traffic vehicle has nowhere to go");
                    }
                    vehicle.destination = None;
                    vehicle.stalled = true;
                    motion.speed = 0.0;
                    continue;
                }
            }
        }

        let mut at = position.0;
        steer(
            entity,
            &mut at,
            &mut motion,
            &config.traffic_steering,
            &obstacles,
            1.0,
            dt,
        );
        position.0 = grid.clamp_to_bounds(at);
    }
}

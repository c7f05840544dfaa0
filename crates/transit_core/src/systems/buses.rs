//! Bus movement: drive to the target stop, pull in, dwell, move on.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut, Without};
use glam::Vec2;

use crate::clock::SimulationClock;
use crate::ecs::{Bus, Motion, Position, TrafficVehicle};
use crate::grid::CityMap;
use crate::network::{Stop, TransitNetwork};
use crate::routing::PathfindingManager;
use crate::scenario::SimConfig;
use crate::steering::{ease_angle, steer, Obstacle};
use crate::traffic::{congestion_multiplier, TrafficProfile};

/// Speed fraction inside the deceleration zone before a stop.
pub fn approach_factor(distance_to_stop: f32, approach_distance: f32, min_factor: f32) -> f32 {
    if approach_distance <= 0.0 {
        return 1.0;
    }
    (distance_to_stop / approach_distance).clamp(min_factor.clamp(0.0, 1.0), 1.0)
}

/// Stop at `stop` and queue exactly one boarding pass for this visit.
fn pull_in(bus: &mut Bus, motion: &mut Motion, stop: Stop, dwell_secs: f32) {
    bus.dwelling = true;
    bus.dwell_timer = dwell_secs;
    bus.pending_stop = Some(stop);
    bus.stop_visits += 1;
    motion.clear_path();
    motion.speed = 0.0;
}

#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn bus_movement_system(
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    profile: Res<TrafficProfile>,
    city: Res<CityMap>,
    network: Res<TransitNetwork>,
    mut pathfinder: ResMut<PathfindingManager>,
    mut buses: Query<(Entity, &mut Bus, &mut Position, &mut Motion)>,
    traffic: Query<(Entity, &TrafficVehicle, &Position, &Motion), Without<Bus>>,
) {
    let dt = clock.dt();
    let grid = &city.grid;
    let params = &config.bus_steering;
    let time_factor = profile.bus_speed.factor_at(clock.hour_of_day());

    let traffic_positions: Vec<Vec2> = traffic.iter().map(|(_, _, p, _)| p.0).collect();
    let obstacles: Vec<Obstacle> = traffic
        .iter()
        .filter(|(_, vehicle, _, _)| !vehicle.stalled)
        .map(|(entity, _, p, m)| (entity, p, m))
        .chain(buses.iter().map(|(entity, _, p, m)| (entity, p, m)))
        .map(|(entity, position, motion)| Obstacle {
            entity,
            position: position.0,
            heading: motion.heading,
        })
        .collect();

    for (entity, mut bus, mut position, mut motion) in &mut buses {
        let Some(route) = network.route(bus.route) else {
            continue;
        };
        let Some(stop) = route.stop_at(bus.target_stop) else {
            continue;
        };
        let stop_at = stop.world(grid);

        if bus.dwelling {
            motion.speed = 0.0;
            bus.dwell_timer -= dt;
            let next_index = (bus.target_stop + 1) % route.stops.len();
            let next_at = route.stops[next_index].world(grid);
            let leg = pathfinder.find_path(stop_at, next_at);
            if bus.dwell_timer > 0.0 {
                let towards = leg[0] - position.0;
                if towards.length_squared() > f32::EPSILON {
                    motion.heading = ease_angle(
                        motion.heading,
                        towards.y.atan2(towards.x),
                        params.base_turn_rate * dt,
                    );
                }
            } else {
                bus.dwelling = false;
                bus.dwell_timer = 0.0;
                bus.target_stop = next_index;
                motion.set_path(leg);
            }
            continue;
        }

        if !motion.has_path() {
            if position.0.distance(stop_at) <= params.arrival_threshold {
                pull_in(&mut bus, &mut motion, stop, config.dwell_secs);
                continue;
            }
            let from = grid.cell_to_world(grid.world_to_cell(position.0));
            motion.set_path(pathfinder.find_path(from, stop_at));
        }

        let nearby = traffic_positions
            .iter()
            .filter(|p| p.distance(position.0) <= config.congestion_radius)
            .count();
        let congestion = congestion_multiplier(
            nearby,
            config.congestion_per_vehicle,
            config.congestion_max_slowdown,
        );
        let approach = approach_factor(
            position.0.distance(stop_at),
            config.stop_approach_distance,
            config.stop_approach_min_factor,
        );

        let mut at = position.0;
        let finished = steer(
            entity,
            &mut at,
            &mut motion,
            params,
            &obstacles,
            time_factor * congestion * approach,
            dt,
        );
        position.0 = at;
        if finished {
            pull_in(&mut bus, &mut motion, stop, config.dwell_secs);
        }
    }
}

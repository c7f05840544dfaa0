//! Passenger behaviour: walking to a stop, waiting, planning, giving up.
//!
//! Riding passengers are moved by their bus and change state only in the
//! boarding pass; this system just checks that the bus still holds them.

use std::sync::Arc;

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};
use glam::Vec2;
use tracing::{debug, warn};

use crate::clock::SimulationClock;
use crate::ecs::{ActivePlan, Bus, Npc, NpcState, Position};
use crate::grid::{CityMap, RoadGrid, Zone};
use crate::network::TransitNetwork;
use crate::planner::RoutePlanner;
use crate::routing::PathfindingManager;
use crate::scenario::{SimConfig, TicketPrice};
use crate::spatial::SpatialIndex;
use crate::telemetry::TransitStats;

/// Advance along `path` by at most `budget` world units. Returns `true` once
/// the last waypoint is reached.
pub fn walk_step(position: &mut Vec2, path: &[Vec2], cursor: &mut usize, mut budget: f32, threshold: f32) -> bool {
    while let Some(target) = path.get(*cursor) {
        let to_target = *target - *position;
        let distance = to_target.length();
        if distance <= threshold {
            *cursor += 1;
            continue;
        }
        if budget <= 0.0 {
            break;
        }
        let step = budget.min(distance);
        *position += to_target / distance * step;
        budget -= step;
    }
    *cursor >= path.len()
}

/// Read-only inputs shared by every waiting passenger in a tick.
struct WaitingContext<'a> {
    grid: &'a RoadGrid,
    zones: &'a [Zone],
    network: &'a TransitNetwork,
    index: &'a SpatialIndex,
    config: &'a SimConfig,
    now: f64,
    ticket_price: f64,
}

impl WaitingContext<'_> {
    /// Make sure the passenger has a stop and, when the network changed since
    /// the last attempt, a final stop and a plan.
    fn tend(&self, npc: &mut Npc, position: Vec2, pathfinder: &mut PathfindingManager, stats: &mut TransitStats) {
        let stop = match npc.state.waiting_stop() {
            Some(stop) => stop,
            None => {
                let Some(stop) = self.index.find_nearest_stop(position) else {
                    return;
                };
                let stop_at = stop.world(self.grid);
                let reach = self.config.reacquire_walk_cells * self.grid.cell_size();
                if stop_at.distance(position) > reach {
                    npc.state = NpcState::Walking {
                        path: pathfinder.find_path(position, stop_at),
                        cursor: 0,
                    };
                    return;
                }
                npc.state = NpcState::Waiting { stop: Some(stop) };
                stop
            }
        };

        if npc.final_stop.is_some() && npc.plan.is_some() {
            return;
        }
        let revision = self.network.revision();
        if npc.planned_at_revision == Some(revision) {
            return;
        }
        npc.planned_at_revision = Some(revision);

        let Some(zone) = self.zones.get(npc.destination_zone) else {
            return;
        };
        let target = zone.centroid(self.grid);
        let acceptance = self.config.acceptance_radius(self.grid.cell_size());
        let final_stop = self
            .index
            .find_nearest_stop(target)
            .filter(|s| s.world(self.grid).distance(target) <= acceptance);
        let Some(final_stop) = final_stop else {
            if !npc.unreachable_logged {
                debug!(id = npc.id, zone = %zone.name, "no stop serves the destination; waiting");
                npc.unreachable_logged = true;
            }
            npc.final_stop = None;
            return;
        };
        npc.final_stop = Some(final_stop);

        if stop == final_stop {
            stats.record_arrival(npc, self.now, self.ticket_price);
            return;
        }
        npc.plan = RoutePlanner
            .plan_trip(stop, final_stop, self.network.routes())
            .map(ActivePlan::new);
        if npc.plan.is_none() {
            debug!(id = npc.id, "no transfer plan; boarding greedily");
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn passenger_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    ticket: Res<TicketPrice>,
    city: Res<CityMap>,
    network: Res<TransitNetwork>,
    index: Res<SpatialIndex>,
    mut pathfinder: ResMut<PathfindingManager>,
    mut stats: ResMut<TransitStats>,
    buses: Query<&Bus>,
    mut npcs: Query<(Entity, &mut Npc, &mut Position)>,
) {
    let dt = clock.dt();
    let ctx = WaitingContext {
        grid: &city.grid,
        zones: &city.zones,
        network: &network,
        index: &index,
        config: &config,
        now: clock.now(),
        ticket_price: ticket.0,
    };

    for (entity, mut npc, mut position) in &mut npcs {
        match npc.state.clone() {
            NpcState::Arrived => {
                commands.entity(entity).despawn();
            }
            NpcState::Traveling { bus, .. } => {
                let aboard = buses
                    .get(bus)
                    .map_or(false, |b| b.passengers.contains(&entity));
                if !aboard {
                    warn!(id = npc.id, ?bus, "rider is not on its bus; returning to waiting");
                    npc.reset_to_waiting();
                }
            }
            NpcState::Walking { path, mut cursor } => {
                let arrived = walk_step(
                    &mut position.0,
                    &path,
                    &mut cursor,
                    config.walk_speed * dt,
                    config.walk_arrival_threshold,
                );
                if arrived {
                    npc.state = NpcState::Waiting {
                        stop: index.find_nearest_stop(position.0),
                    };
                    ctx.tend(&mut npc, position.0, &mut pathfinder, &mut stats);
                } else {
                    npc.state = NpcState::Walking {
                        path: Arc::clone(&path),
                        cursor,
                    };
                }
            }
            NpcState::Waiting { .. } => {
                npc.wait_time += dt;
                if npc.wait_time > config.max_wait_secs {
                    debug!(id = npc.id, wait = npc.wait_time, "passenger gave up");
                    stats.record_give_up(&npc);
                    commands.entity(entity).despawn();
                    continue;
                }
                ctx.tend(&mut npc, position.0, &mut pathfinder, &mut stats);
            }
        }
    }
}

//! Boarding pass: runs once per stop visit, right after the bus pulls in.
//!
//! Riders whose alighting stop is this one get off first, then waiting
//! passengers board in order of longest wait while seats remain. A passenger
//! only changes hands between the stop and a bus here.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut, Without};
use tracing::{debug, error, warn};

use crate::clock::SimulationClock;
use crate::ecs::{ActivePlan, Bus, Npc, NpcState, Position};
use crate::grid::{CityMap, RoadGrid, Zone};
use crate::network::{Route, Stop, TransitNetwork};
use crate::scenario::{SimConfig, TicketPrice};
use crate::spatial::SpatialIndex;
use crate::telemetry::TransitStats;

/// What happened to a rider getting off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alighting {
    Arrived,
    Transferred,
    Dropped,
}

/// Inputs shared by every bus in one boarding pass.
struct StopContext<'a> {
    grid: &'a RoadGrid,
    zones: &'a [Zone],
    index: &'a SpatialIndex,
    acceptance: f32,
    transfer_cap: u32,
    now: f64,
    ticket_price: f64,
}

impl StopContext<'_> {
    fn destination_point(&self, npc: &Npc) -> Option<glam::Vec2> {
        self.zones
            .get(npc.destination_zone)
            .map(|zone| zone.centroid(self.grid))
    }

    /// Take a rider off at `stop`.
    fn alight(&self, npc: &mut Npc, stop: Stop, stats: &mut TransitStats) -> Alighting {
        let final_stop = match npc.final_stop {
            Some(stop) => Some(stop),
            None => {
                warn!(id = npc.id, "rider has no final stop; looking it up again");
                self.destination_point(npc)
                    .and_then(|point| self.index.find_nearest_stop(point))
            }
        };
        let Some(final_stop) = final_stop else {
            error!(id = npc.id, "rider has no destination stop; dropping");
            stats.dropped_passengers += 1;
            return Alighting::Dropped;
        };
        npc.final_stop = Some(final_stop);

        if stop == final_stop {
            let in_range = self
                .destination_point(npc)
                .map_or(false, |point| stop.world(self.grid).distance(point) <= self.acceptance);
            if in_range {
                stats.record_arrival(npc, self.now, self.ticket_price);
                return Alighting::Arrived;
            }
            debug!(id = npc.id, "final stop is out of range of the destination; transferring");
            npc.state = NpcState::Waiting { stop: Some(stop) };
            npc.transfer_count += 1;
            npc.plan = None;
            npc.final_stop = None;
            npc.planned_at_revision = None;
            return Alighting::Transferred;
        }

        npc.state = NpcState::Waiting { stop: Some(stop) };
        npc.transfer_count += 1;
        let on_plan = npc
            .plan
            .as_ref()
            .and_then(ActivePlan::next_leg)
            .map(|(_, leg_stop)| leg_stop)
            == Some(stop);
        if on_plan {
            if let Some(plan) = npc.plan.as_mut() {
                plan.advance();
            }
        } else {
            npc.plan = None;
            npc.planned_at_revision = None;
        }
        Alighting::Transferred
    }

    /// Where a waiting passenger at `stop` would ride this bus to, or `None`
    /// if it stays.
    fn boarding_target(&self, npc: &mut Npc, stop: Stop, route_index: usize, routes: &[Route]) -> Option<Stop> {
        if npc.transfer_count >= self.transfer_cap {
            return None;
        }
        let route = routes.get(route_index)?;

        if let Some(active) = &npc.plan {
            if let (Some(current), Some((leg_route, leg_stop))) = (active.current_stop(), active.next_leg()) {
                if current == stop {
                    if leg_route == route_index && route.serves(leg_stop) {
                        return Some(leg_stop);
                    }
                    let other_route_valid = routes
                        .get(leg_route)
                        .map_or(false, |r| r.serves(stop) && r.serves(leg_stop));
                    if leg_route != route_index && other_route_valid {
                        return None;
                    }
                }
            }
            debug!(id = npc.id, "trip plan no longer matches the network; discarding");
            npc.plan = None;
        }

        let final_stop = npc.final_stop?;
        greedy_target(route, stop, final_stop, self.grid)
    }
}

/// Greedy fallback: ride straight to `final_stop` if the route serves it,
/// otherwise to the route's stop closest to it, if that is an improvement.
pub fn greedy_target(route: &Route, stop: Stop, final_stop: Stop, grid: &RoadGrid) -> Option<Stop> {
    if stop == final_stop {
        return None;
    }
    if route.serves(final_stop) {
        return Some(final_stop);
    }
    let target = final_stop.world(grid);
    let here = stop.world(grid).distance(target);
    route
        .stops
        .iter()
        .copied()
        .filter(|s| *s != stop)
        .map(|s| (s, s.world(grid).distance(target)))
        .filter(|(_, d)| *d < here)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(s, _)| s)
}

#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn boarding_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    ticket: Res<TicketPrice>,
    city: Res<CityMap>,
    index: Res<SpatialIndex>,
    mut network: ResMut<TransitNetwork>,
    mut stats: ResMut<TransitStats>,
    mut buses: Query<(Entity, &mut Bus, &Position)>,
    mut npcs: Query<(Entity, &mut Npc, &mut Position), Without<Bus>>,
) {
    let ctx = StopContext {
        grid: &city.grid,
        zones: &city.zones,
        index: &index,
        acceptance: config.acceptance_radius(city.grid.cell_size()),
        transfer_cap: config.transfer_cap,
        now: clock.now(),
        ticket_price: ticket.0,
    };
    let mut ridership: Vec<(usize, u64)> = Vec::new();

    for (bus_entity, mut bus, bus_position) in &mut buses {
        let Some(stop) = bus.pending_stop.take() else {
            continue;
        };
        bus.boarding_passes += 1;
        let stop_at = stop.world(ctx.grid);

        for rider in std::mem::take(&mut bus.passengers) {
            let Ok((_, mut npc, mut position)) = npcs.get_mut(rider) else {
                warn!(?rider, "bus listed a passenger that no longer exists");
                continue;
            };
            let alight_at = match npc.state {
                NpcState::Traveling { bus: owner, alight_at } if owner == bus_entity => alight_at,
                _ => {
                    warn!(id = npc.id, "bus listed a passenger riding elsewhere; removing");
                    continue;
                }
            };
            if alight_at != stop {
                bus.passengers.push(rider);
                continue;
            }
            position.0 = stop_at;
            if ctx.alight(&mut npc, stop, &mut stats) == Alighting::Dropped {
                commands.entity(rider).despawn();
            }
        }

        if bus.free_seats() == 0 {
            continue;
        }
        let mut queue: Vec<(Entity, f32, u64)> = npcs
            .iter()
            .filter(|(_, npc, _)| npc.state.waiting_stop() == Some(stop))
            .map(|(entity, npc, _)| (entity, npc.wait_time, npc.id))
            .collect();
        queue.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));

        let mut boarded = 0;
        for (rider, _, _) in queue {
            if bus.free_seats() == 0 {
                break;
            }
            let Ok((_, mut npc, mut position)) = npcs.get_mut(rider) else {
                continue;
            };
            let Some(alight_at) = ctx.boarding_target(&mut npc, stop, bus.route, network.routes()) else {
                continue;
            };
            npc.state = NpcState::Traveling {
                bus: bus_entity,
                alight_at,
            };
            if npc.boarded_at.is_none() {
                npc.boarded_at = Some(ctx.now);
            }
            position.0 = bus_position.0;
            bus.passengers.push(rider);
            boarded += 1;
        }
        if boarded > 0 {
            ridership.push((bus.route, boarded));
        }
    }

    for (route, riders) in ridership {
        network.record_ridership(route, riders);
    }

    // Riders ride along.
    for (_, bus, bus_position) in &buses {
        for rider in &bus.passengers {
            if let Ok((_, _, mut position)) = npcs.get_mut(*rider) {
                position.0 = bus_position.0;
            }
        }
    }
}

use bevy_ecs::prelude::{Entity, Query, Res, ResMut, With};

use crate::clock::SimulationClock;
use crate::ecs::{Bus, Motion, Npc, Position, TrafficVehicle};
use crate::grid::CityMap;
use crate::network::TransitNetwork;
use crate::scenario::SimConfig;
use crate::telemetry::{
    BusSnapshot, LatestSnapshot, NpcSnapshot, RouteSnapshot, SimSnapshot, TransitStats,
    VehicleSnapshot,
};

/// Samples fleet utilisation (riders / seats) every `utilization_sample_secs`.
pub fn sample_utilization_system(
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    mut stats: ResMut<TransitStats>,
    buses: Query<&Bus>,
) {
    let now = clock.now();
    if let Some(last) = stats.last_sample_at {
        if now - last < f64::from(config.utilization_sample_secs) {
            return;
        }
    }
    let (riders, seats) = buses
        .iter()
        .fold((0usize, 0usize), |(r, s), bus| (r + bus.passengers.len(), s + bus.capacity));
    let sample = if seats == 0 {
        0.0
    } else {
        riders as f32 / seats as f32
    };
    stats.push_utilization(sample, now);
}

#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    city: Res<CityMap>,
    network: Res<TransitNetwork>,
    mut latest: ResMut<LatestSnapshot>,
    npcs: Query<(Entity, &Npc, &Position)>,
    buses: Query<(Entity, &Bus, &Position, &Motion)>,
    traffic: Query<(Entity, &Position, &Motion), With<TrafficVehicle>>,
) {
    let routes = network
        .routes()
        .iter()
        .map(|route| RouteSnapshot {
            name: route.name.clone(),
            color: route.color,
            stops: route.stops.clone(),
            bus_count: route.buses.len(),
            ridership: route.ridership,
        })
        .collect();

    let buses = buses
        .iter()
        .map(|(entity, bus, position, motion)| BusSnapshot {
            entity,
            route: bus.route,
            position: position.0,
            heading: motion.heading,
            passengers: bus.passengers.len(),
            dwelling: bus.dwelling,
        })
        .collect();

    let npcs = npcs
        .iter()
        .map(|(entity, npc, position)| NpcSnapshot {
            entity,
            id: npc.id,
            state: npc.state.kind(),
            position: position.0,
            transfers: npc.transfer_count,
        })
        .collect();

    let traffic = traffic
        .iter()
        .map(|(entity, position, motion)| VehicleSnapshot {
            entity,
            position: position.0,
            heading: motion.heading,
        })
        .collect();

    latest.0 = Some(SimSnapshot {
        time: clock.now(),
        tick: clock.tick(),
        hour_of_day: clock.hour_of_day(),
        grid: city.grid.clone(),
        zones: city.zones.clone(),
        routes,
        buses,
        npcs,
        traffic,
    });
}

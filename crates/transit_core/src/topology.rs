//! Live topology edits, persistence and the pause signal.
//!
//! Every edit runs against the world between ticks. After the network changes
//! the spatial index is rebuilt, affected buses drop their paths, and any
//! passenger whose stop or alighting point disappeared is put back into a state
//! it can recover from.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::{Entity, With, World};
use bevy_ecs::world::Mut;
use tracing::{info, warn};

use crate::clock::SimulationClock;
use crate::ecs::{Bus, Motion, Npc, NpcState, Position, TrafficVehicle};
use crate::error::TopologyError;
use crate::grid::CityMap;
use crate::network::{Route, RouteTopology, Stop, TransitNetwork, MIN_ROUTE_STOPS};
use crate::scenario::{SimConfig, TicketPrice};
use crate::spatial::SpatialIndex;

/// Colours cycled through when a route is created without one.
pub const ROUTE_PALETTE: [[u8; 3]; 6] = [
    [220, 60, 60],
    [60, 120, 220],
    [60, 170, 90],
    [230, 160, 40],
    [150, 80, 200],
    [40, 180, 190],
];

fn check_stops(world: &World, stops: &[Stop]) -> Result<(), TopologyError> {
    if stops.len() < MIN_ROUTE_STOPS {
        return Err(TopologyError::TooFewStops {
            min: MIN_ROUTE_STOPS,
            got: stops.len(),
        });
    }
    stops.iter().try_for_each(|stop| check_on_road(world, *stop))
}

fn check_on_road(world: &World, stop: Stop) -> Result<(), TopologyError> {
    if world.resource::<CityMap>().grid.is_road(stop.cell()) {
        Ok(())
    } else {
        Err(TopologyError::NotOnRoad(stop))
    }
}

/// Stop slot a new bus starts from, spreading buses around the loop.
fn initial_stop(bus_slot: usize, stop_count: usize) -> usize {
    if stop_count == 0 {
        return 0;
    }
    (bus_slot * stop_count / (bus_slot + 1)) % stop_count
}

fn spawn_bus(world: &mut World, route: usize) -> Result<Entity, TopologyError> {
    let (stops, slot) = {
        let network = world.resource::<TransitNetwork>();
        let r = network.route(route).ok_or(TopologyError::UnknownRoute(route))?;
        (r.stops.clone(), r.buses.len())
    };
    if stops.is_empty() {
        return Err(TopologyError::TooFewStops {
            min: MIN_ROUTE_STOPS,
            got: 0,
        });
    }
    let start = initial_stop(slot, stops.len());
    let grid = world.resource::<CityMap>().grid.clone();
    let at = stops[start].world(&grid);
    let next = stops[(start + 1) % stops.len()].world(&grid);
    let towards = next - at;
    let heading = if towards.length_squared() > f32::EPSILON {
        towards.y.atan2(towards.x)
    } else {
        0.0
    };
    let capacity = world.resource::<SimConfig>().bus_capacity;

    let entity = world
        .spawn((Bus::new(route, start, capacity), Position(at), Motion::idle(heading)))
        .id();
    world
        .resource_mut::<TransitNetwork>()
        .route_mut(route)?
        .buses
        .push(entity);
    Ok(entity)
}

/// Despawn a bus, returning everyone aboard to `Waiting { stop: None }`.
fn retire_bus(world: &mut World, bus: Entity) -> usize {
    let riders = world
        .get::<Bus>(bus)
        .map(|b| b.passengers.clone())
        .unwrap_or_default();
    let mut displaced = 0;
    for rider in riders {
        if let Some(mut npc) = world.get_mut::<Npc>(rider) {
            npc.reset_to_waiting();
            displaced += 1;
        }
    }
    world.despawn(bus);
    displaced
}

/// Rebuild the spatial index and repair everything that depends on stop
/// positions. `touched` limits the bus path reset to one route.
fn resync(world: &mut World, touched: Option<usize>) {
    world.resource_scope(|world, mut index: Mut<SpatialIndex>| {
        index.rebuild_index(world.resource::<TransitNetwork>().routes());
    });

    let routes: Vec<Route> = world.resource::<TransitNetwork>().routes().to_vec();
    let grid = world.resource::<CityMap>().grid.clone();

    let mut bus_routes: HashMap<Entity, usize> = HashMap::new();
    let mut buses = world.query::<(Entity, &mut Bus, &mut Motion)>();
    for (entity, mut bus, mut motion) in buses.iter_mut(world) {
        bus_routes.insert(entity, bus.route);
        if touched.map_or(true, |r| r == bus.route) {
            let stop_count = routes.get(bus.route).map_or(0, |r| r.stops.len());
            if bus.target_stop >= stop_count {
                bus.target_stop = 0;
            }
            motion.clear_path();
        }
    }

    let served: HashSet<Stop> = routes.iter().flat_map(|r| r.stops.iter().copied()).collect();
    let mut npcs = world.query::<&mut Npc>();
    for mut npc in npcs.iter_mut(world) {
        match npc.state.clone() {
            NpcState::Waiting { stop: Some(stop) } if !served.contains(&stop) => {
                npc.reset_to_waiting();
            }
            NpcState::Traveling { bus, alight_at } => {
                let Some(route) = bus_routes.get(&bus).and_then(|r| routes.get(*r)) else {
                    continue;
                };
                if route.serves(alight_at) {
                    continue;
                }
                let target = alight_at.world(&grid);
                let replacement = route
                    .stops
                    .iter()
                    .copied()
                    .min_by(|a, b| {
                        a.world(&grid)
                            .distance_squared(target)
                            .total_cmp(&b.world(&grid).distance_squared(target))
                    });
                if let Some(stop) = replacement {
                    npc.state = NpcState::Traveling {
                        bus,
                        alight_at: stop,
                    };
                    npc.plan = None;
                    npc.planned_at_revision = None;
                }
            }
            _ => {}
        }
    }
}

/// Create a route with one bus. Returns the new route index.
pub fn add_route(world: &mut World, stops: Vec<Stop>, color: Option<[u8; 3]>) -> Result<usize, TopologyError> {
    check_stops(world, &stops)?;
    let index = {
        let mut network = world.resource_mut::<TransitNetwork>();
        let next = network.routes().len();
        network.push_route(Route {
            name: format!("Route {}", next + 1),
            color: color.unwrap_or(ROUTE_PALETTE[next % ROUTE_PALETTE.len()]),
            stops,
            buses: Vec::new(),
            ridership: 0,
        })
    };
    spawn_bus(world, index)?;
    resync(world, Some(index));
    info!(route = index, "route added");
    Ok(index)
}

/// Delete a route and its buses. Higher route indices shift down by one.
pub fn remove_route(world: &mut World, route: usize) -> Result<(), TopologyError> {
    let removed = world.resource_mut::<TransitNetwork>().take_route(route)?;
    let mut displaced = 0;
    for bus in &removed.buses {
        displaced += retire_bus(world, *bus);
    }

    let mut buses = world.query::<&mut Bus>();
    for mut bus in buses.iter_mut(world) {
        if bus.route > route {
            bus.route -= 1;
        }
    }
    // Plans carry route indices, which have just shifted.
    let mut npcs = world.query::<&mut Npc>();
    for mut npc in npcs.iter_mut(world) {
        npc.plan = None;
        npc.planned_at_revision = None;
    }

    resync(world, None);
    info!(route, displaced, "route removed");
    Ok(())
}

/// Insert a stop before `at_index` (`at_index == len` appends).
pub fn add_stop(world: &mut World, route: usize, at_index: usize, stop: Stop) -> Result<(), TopologyError> {
    check_on_road(world, stop)?;
    {
        let mut network = world.resource_mut::<TransitNetwork>();
        let r = network.route_mut(route)?;
        if at_index > r.stops.len() {
            return Err(TopologyError::UnknownStop {
                route,
                index: at_index,
            });
        }
        r.stops.insert(at_index, stop);
        network.mark_changed();
    }
    resync(world, Some(route));
    info!(route, x = stop.x, y = stop.y, "stop added");
    Ok(())
}

pub fn remove_stop(world: &mut World, route: usize, index: usize) -> Result<Stop, TopologyError> {
    let removed = {
        let mut network = world.resource_mut::<TransitNetwork>();
        let r = network.route_mut(route)?;
        if index >= r.stops.len() {
            return Err(TopologyError::UnknownStop { route, index });
        }
        if r.stops.len() <= MIN_ROUTE_STOPS {
            return Err(TopologyError::TooFewStops {
                min: MIN_ROUTE_STOPS,
                got: r.stops.len() - 1,
            });
        }
        let removed = r.stops.remove(index);
        network.mark_changed();
        removed
    };
    resync(world, Some(route));
    info!(route, index, "stop removed");
    Ok(removed)
}

/// Relocate a stop. Identity is positional, so this is a replace.
pub fn move_stop(world: &mut World, route: usize, index: usize, to: Stop) -> Result<(), TopologyError> {
    check_on_road(world, to)?;
    {
        let mut network = world.resource_mut::<TransitNetwork>();
        let r = network.route_mut(route)?;
        let slot = r
            .stops
            .get_mut(index)
            .ok_or(TopologyError::UnknownStop { route, index })?;
        *slot = to;
        network.mark_changed();
    }
    resync(world, Some(route));
    info!(route, index, x = to.x, y = to.y, "stop moved");
    Ok(())
}

pub fn add_bus(world: &mut World, route: usize) -> Result<Entity, TopologyError> {
    let max = world.resource::<SimConfig>().max_buses_per_route;
    let running = world
        .resource::<TransitNetwork>()
        .route(route)
        .ok_or(TopologyError::UnknownRoute(route))?
        .buses
        .len();
    if running >= max {
        return Err(TopologyError::BusLimit { route, max });
    }
    let entity = spawn_bus(world, route)?;
    world.resource_mut::<TransitNetwork>().mark_changed();
    resync(world, Some(route));
    info!(route, buses = running + 1, "bus added");
    Ok(entity)
}

/// Remove the most recently added bus. Its passengers return to waiting with
/// no stop and re-acquire one on their next tick.
pub fn remove_bus(world: &mut World, route: usize) -> Result<(), TopologyError> {
    let bus = {
        let mut network = world.resource_mut::<TransitNetwork>();
        let bus = network
            .route_mut(route)?
            .buses
            .pop()
            .ok_or(TopologyError::NoBuses(route))?;
        network.mark_changed();
        bus
    };
    let displaced = retire_bus(world, bus);
    resync(world, Some(route));
    info!(route, displaced, "bus removed");
    Ok(())
}

pub fn export_topology(world: &World) -> RouteTopology {
    RouteTopology::from_network(world.resource::<TransitNetwork>())
}

/// Replace the whole network. Every agent, bus and traffic vehicle is
/// despawned; only the topology survives a reload.
pub fn restore_topology(world: &mut World, topology: &RouteTopology) -> Result<(), TopologyError> {
    let max = world.resource::<SimConfig>().max_buses_per_route;
    for (route, record) in topology.routes.iter().enumerate() {
        check_stops(world, &record.stops)?;
        if record.bus_count > max {
            return Err(TopologyError::BusLimit { route, max });
        }
    }

    let mut doomed: Vec<Entity> = Vec::new();
    doomed.extend(world.query_filtered::<Entity, With<Npc>>().iter(world));
    doomed.extend(world.query_filtered::<Entity, With<Bus>>().iter(world));
    doomed.extend(world.query_filtered::<Entity, With<TrafficVehicle>>().iter(world));
    for entity in doomed {
        world.despawn(entity);
    }

    world.resource_mut::<TransitNetwork>().clear();
    for (i, record) in topology.routes.iter().enumerate() {
        let index = world.resource_mut::<TransitNetwork>().push_route(Route {
            name: format!("Route {}", i + 1),
            color: record.color,
            stops: record.stops.clone(),
            buses: Vec::new(),
            ridership: 0,
        });
        for _ in 0..record.bus_count {
            spawn_bus(world, index)?;
        }
    }
    resync(world, None);
    info!(routes = topology.routes.len(), "topology restored");
    Ok(())
}

pub fn restore_topology_json(world: &mut World, raw: &str) -> Result<(), TopologyError> {
    let topology = RouteTopology::from_json(raw).map_err(|err| {
        warn!(%err, "rejecting saved topology");
        err
    })?;
    restore_topology(world, &topology)
}

pub fn set_paused(world: &mut World, paused: bool) {
    world.resource_mut::<SimulationClock>().set_paused(paused);
}

pub fn set_ticket_price(world: &mut World, price: f64) {
    world.insert_resource(TicketPrice(price.max(0.0)));
}

#![allow(dead_code)]

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, World};
use transit_core::ecs::{Bus, Npc, NpcState, NpcStateKind, Position, TrafficVehicle};
use transit_core::network::TransitNetwork;

pub fn count_npcs(world: &mut World, kind: NpcStateKind) -> usize {
    world
        .query::<&Npc>()
        .iter(world)
        .filter(|npc| npc.state.kind() == kind)
        .count()
}

pub fn npc_total(world: &mut World) -> usize {
    world.query::<&Npc>().iter(world).count()
}

pub fn traffic_total(world: &mut World) -> usize {
    world.query::<&TrafficVehicle>().iter(world).count()
}

pub fn bus_entities(world: &World, route: usize) -> Vec<Entity> {
    world
        .resource::<TransitNetwork>()
        .route(route)
        .map(|r| r.buses.clone())
        .unwrap_or_default()
}

pub fn traffic_positions(world: &mut World) -> Vec<Position> {
    world
        .query::<(&Position, &TrafficVehicle)>()
        .iter(world)
        .map(|(p, _)| *p)
        .collect()
}

/// Cross-check buses, their riders and the network after a tick.
///
/// Every rider listed on a bus is traveling on that bus, every traveling
/// passenger is listed exactly once, no bus is over capacity, and every bus
/// points at a live route and stop.
pub fn assert_riders_consistent(world: &mut World) {
    let network_buses: Vec<(usize, Entity)> = world
        .resource::<TransitNetwork>()
        .routes()
        .iter()
        .enumerate()
        .flat_map(|(i, r)| r.buses.iter().map(move |b| (i, *b)))
        .collect();
    let stop_counts: Vec<usize> = world
        .resource::<TransitNetwork>()
        .routes()
        .iter()
        .map(|r| r.stops.len())
        .collect();

    let mut listed: HashMap<Entity, Entity> = HashMap::new();
    let buses: Vec<(Entity, Bus)> = world
        .query::<(Entity, &Bus)>()
        .iter(world)
        .map(|(e, b)| (e, b.clone()))
        .collect();
    assert_eq!(buses.len(), network_buses.len(), "bus entities and network disagree");

    for (entity, bus) in &buses {
        assert!(
            network_buses.contains(&(bus.route, *entity)),
            "bus {entity:?} is not registered on route {}",
            bus.route
        );
        assert!(bus.target_stop < stop_counts[bus.route]);
        assert!(bus.passengers.len() <= bus.capacity, "bus over capacity");
        for rider in &bus.passengers {
            assert!(listed.insert(*rider, *entity).is_none(), "rider listed twice");
            let npc = world.get::<Npc>(*rider).expect("listed rider exists");
            match npc.state {
                NpcState::Traveling { bus: owner, .. } => assert_eq!(owner, *entity),
                ref other => panic!("listed rider is {other:?}"),
            }
        }
    }

    let traveling: Vec<Entity> = world
        .query::<(Entity, &Npc)>()
        .iter(world)
        .filter(|(_, npc)| npc.state.kind() == NpcStateKind::Traveling)
        .map(|(e, _)| e)
        .collect();
    for rider in traveling {
        assert!(listed.contains_key(&rider), "traveling passenger is on no bus");
    }
}

#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, World};
use transit_core::ecs::{Npc, NpcStateKind};
use transit_core::grid::{RoadGrid, Zone};
use transit_core::network::Stop;
use transit_core::scenario::{build_scenario, ScenarioParams, SimConfig};
use transit_core::test_helpers::{corridor_city, crossing_city, quiet_config, TEST_SEED};
use transit_core::topology::add_route;
use transit_core::traffic::TrafficProfileKind;

/// Builder for reproducible test worlds on the fixture cities.
#[derive(Debug, Clone)]
pub struct TestWorldBuilder {
    grid: RoadGrid,
    zones: Vec<Zone>,
    config: SimConfig,
    seed: u64,
    ticket_price: f64,
    traffic_profile: TrafficProfileKind,
    routes: Vec<Vec<Stop>>,
}

impl TestWorldBuilder {
    /// One east-west street with homes at the west end and shops at the east end.
    pub fn corridor() -> Self {
        let (grid, zones) = corridor_city();
        Self::on(grid, zones)
    }

    /// Two streets crossing at (10, 5).
    pub fn crossing() -> Self {
        let (grid, zones) = crossing_city();
        Self::on(grid, zones)
    }

    pub fn on(grid: RoadGrid, zones: Vec<Zone>) -> Self {
        Self {
            grid,
            zones,
            config: quiet_config(),
            seed: TEST_SEED,
            ticket_price: 2.0,
            traffic_profile: TrafficProfileKind::Flat,
            routes: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
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

    /// Add a route, created in order when the world is built.
    pub fn with_route(mut self, stops: &[(i32, i32)]) -> Self {
        self.routes
            .push(stops.iter().map(|&(x, y)| Stop::new(x, y)).collect());
        self
    }

    pub fn build(self) -> World {
        let mut world = World::new();
        build_scenario(
            &mut world,
            ScenarioParams::new(self.grid, self.zones)
                .with_config(self.config)
                .with_seed(self.seed)
                .with_ticket_price(self.ticket_price)
                .with_traffic_profile(self.traffic_profile),
        );
        for stops in self.routes {
            add_route(&mut world, stops, None).expect("fixture route is valid");
        }
        world
    }
}

/// State of a passenger, or `None` once it has been despawned.
pub fn npc_state(world: &World, entity: Entity) -> Option<NpcStateKind> {
    world.get::<Npc>(entity).map(|npc| npc.state.kind())
}

pub fn npc(world: &World, entity: Entity) -> Npc {
    world.get::<Npc>(entity).cloned().expect("passenger exists")
}

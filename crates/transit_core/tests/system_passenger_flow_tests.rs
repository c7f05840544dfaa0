mod support;

use transit_core::ecs::{Npc, NpcState, NpcStateKind};
use transit_core::error::TopologyError;
use transit_core::grid::{GridPos, RoadGrid, Zone, ZoneKind};
use transit_core::network::{Stop, TransitNetwork};
use transit_core::systems::spawner::spawn_npc_between;
use transit_core::telemetry::TransitStats;
use transit_core::test_helpers::{quiet_config, TEST_CELL_SIZE};
use transit_core::topology::remove_bus;

use support::schedule::TickRunner;
use support::world::{npc, npc_state, TestWorldBuilder};

#[test]
fn passenger_rides_the_corridor_and_pays_once() {
    let mut world = TestWorldBuilder::corridor()
        .with_ticket_price(2.5)
        .with_route(&[(1, 5), (18, 5)])
        .build();
    let mut runner = TickRunner::new();

    let rider = spawn_npc_between(&mut world, 0, 1).expect("passenger");
    let before = world.resource::<TransitStats>().clone();

    let boarded = runner.run_until(&mut world, 2_000, |w| {
        npc_state(w, rider) == Some(NpcStateKind::Traveling)
    });
    assert!(boarded.is_some(), "passenger never boarded");
    let on_board = npc(&world, rider);
    assert!(on_board.boarded_at.is_some());
    assert_eq!(on_board.final_stop, Some(Stop::new(18, 5)));

    let arrived = runner.run_until(&mut world, 2_000, |w| {
        matches!(npc_state(w, rider), Some(NpcStateKind::Arrived) | None)
    });
    assert!(arrived.is_some(), "passenger never arrived");

    let stats = world.resource::<TransitStats>();
    assert_eq!(stats.trips_completed, before.trips_completed + 1);
    assert_eq!(stats.revenue - before.revenue, 2.5);
    assert_eq!(stats.give_ups, 0);
    assert!(stats.total_transit_secs > 0.0);

    // Arrived passengers are removed on the following tick and never re-counted.
    runner.run(&mut world, 3);
    assert!(npc_state(&world, rider).is_none());
    assert_eq!(world.resource::<TransitStats>().trips_completed, 1);
    assert_eq!(world.resource::<TransitNetwork>().routes()[0].ridership, 1);
}

#[test]
fn removing_the_only_bus_returns_riders_to_waiting() {
    let mut world = TestWorldBuilder::corridor()
        .with_route(&[(1, 5), (18, 5)])
        .build();
    let mut runner = TickRunner::new();
    let rider = spawn_npc_between(&mut world, 0, 1).expect("passenger");

    runner
        .run_until(&mut world, 2_000, |w| {
            npc_state(w, rider) == Some(NpcStateKind::Traveling)
        })
        .expect("passenger boards");

    remove_bus(&mut world, 0).expect("bus removed");

    let displaced = npc(&world, rider);
    assert_eq!(displaced.state, NpcState::Waiting { stop: None });
    assert!(displaced.plan.is_none());
    assert!(world.resource::<TransitNetwork>().routes()[0].buses.is_empty());
    assert!(matches!(
        remove_bus(&mut world, 0),
        Err(TopologyError::NoBuses(0))
    ));

    // The stranded rider finds a stop again and keeps waiting.
    runner
        .run_until(&mut world, 200, |w| {
            w.get::<Npc>(rider)
                .and_then(|n| n.state.waiting_stop())
                .is_some()
        })
        .expect("passenger re-acquires a stop");
}

#[test]
fn passenger_with_unserved_destination_gives_up() {
    let config = quiet_config().with_max_wait_secs(5.0);
    let mut world = TestWorldBuilder::corridor()
        .with_config(config)
        .with_route(&[(1, 5), (5, 5)])
        .build();
    let mut runner = TickRunner::new();
    let rider = spawn_npc_between(&mut world, 0, 1).expect("passenger");

    runner
        .run_until(&mut world, 600, |w| npc_state(w, rider).is_none())
        .expect("passenger gives up");

    let stats = world.resource::<TransitStats>();
    assert_eq!(stats.give_ups, 1);
    assert_eq!(stats.trips_completed, 0);
    assert_eq!(stats.revenue, 0.0);
}

#[test]
fn passenger_whose_first_stop_serves_the_destination_arrives_on_foot() {
    // Two small zones either side of x = 10 share the stop at (10, 5).
    let mut grid = RoadGrid::new(20, 10, TEST_CELL_SIZE);
    grid.paint_road(GridPos::new(0, 5), GridPos::new(19, 5));
    let zones = vec![
        Zone::new(ZoneKind::Residential, "flats", GridPos::new(8, 2), 2, 3),
        Zone::new(ZoneKind::Commercial, "corner shop", GridPos::new(11, 2), 2, 3),
    ];
    for zone in &zones {
        zone.paint(&mut grid);
    }
    let mut world = TestWorldBuilder::on(grid, zones)
        .with_route(&[(10, 5), (19, 5)])
        .build();
    let mut runner = TickRunner::new();
    let rider = spawn_npc_between(&mut world, 0, 1).expect("passenger");

    runner
        .run_until(&mut world, 1_000, |w| npc_state(w, rider).is_none())
        .expect("trip completes");

    let stats = world.resource::<TransitStats>();
    assert_eq!(stats.trips_completed, 1);
    assert_eq!(stats.walk_only_trips, 1);
    assert_eq!(stats.revenue, 0.0);
}

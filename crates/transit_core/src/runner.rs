//! Tick orchestration: one schedule run per accepted frame.
//!
//! The clock decides whether a frame is simulated. Accepted frames run the
//! stages in a fixed order, passengers before buses, with deferred commands
//! applied between stages so despawns and spawns are visible to the next one.

use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs, IntoSystemSetConfigs, SystemSet};
use tracing::trace;

use crate::clock::SimulationClock;
use crate::systems::{
    boarding::boarding_system,
    buses::bus_movement_system,
    passengers::passenger_system,
    spawner::{npc_spawner_system, traffic_population_system},
    telemetry_snapshot::{capture_snapshot_system, sample_utilization_system},
    traffic::traffic_movement_system,
};

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickStage {
    /// Passenger arrivals and traffic population.
    Spawn,
    /// Passenger and ambient-traffic behaviour.
    Entities,
    /// Bus movement, then the boarding pass.
    Routes,
    /// Utilisation sampling and the render snapshot.
    Snapshot,
}

pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.configure_sets(
        (
            TickStage::Spawn,
            TickStage::Entities,
            TickStage::Routes,
            TickStage::Snapshot,
        )
            .chain(),
    );
    schedule.add_systems(
        (
            (npc_spawner_system, traffic_population_system)
                .chain()
                .in_set(TickStage::Spawn),
            apply_deferred,
            (passenger_system, traffic_movement_system)
                .chain()
                .in_set(TickStage::Entities),
            apply_deferred,
            (bus_movement_system, boarding_system)
                .chain()
                .in_set(TickStage::Routes),
            apply_deferred,
            (sample_utilization_system, capture_snapshot_system)
                .chain()
                .in_set(TickStage::Snapshot),
        )
            .chain(),
    );
    schedule
}

/// Advance the clock by `frame_secs` and run one tick. Returns `false` when the
/// tick was skipped (paused, or the frame is longer than the sanity limit).
pub fn step(world: &mut World, schedule: &mut Schedule, frame_secs: f32) -> bool {
    match world.resource_mut::<SimulationClock>().advance(frame_secs) {
        Ok(_) => {
            schedule.run(world);
            true
        }
        Err(reason) => {
            trace!(?reason, frame_secs, "tick skipped");
            false
        }
    }
}

/// Run `ticks` frames of `dt` seconds. Returns how many actually ran.
pub fn run_ticks(world: &mut World, schedule: &mut Schedule, ticks: usize, dt: f32) -> usize {
    (0..ticks).filter(|_| step(world, schedule, dt)).count()
}

/// Run `ticks` frames, calling `hook` after each tick that ran.
pub fn run_ticks_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    ticks: usize,
    dt: f32,
    mut hook: F,
) -> usize
where
    F: FnMut(&World),
{
    let mut ran = 0;
    for _ in 0..ticks {
        if step(world, schedule, dt) {
            ran += 1;
            hook(world);
        }
    }
    ran
}

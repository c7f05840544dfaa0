#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use transit_core::runner::{run_ticks, simulation_schedule, step};

/// Fixed step used by the integration tests, in seconds.
pub const TEST_DT: f32 = 0.1;

/// Owns a reusable `Schedule` so tests can step or run a batch of ticks.
pub struct TickRunner {
    schedule: Schedule,
}

impl Default for TickRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TickRunner {
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    pub fn tick(&mut self, world: &mut World) -> bool {
        step(world, &mut self.schedule, TEST_DT)
    }

    pub fn run(&mut self, world: &mut World, ticks: usize) -> usize {
        run_ticks(world, &mut self.schedule, ticks, TEST_DT)
    }

    /// Tick until `done` holds or `max_ticks` ran. Returns the ticks used, or
    /// `None` if the condition never held.
    pub fn run_until<F>(&mut self, world: &mut World, max_ticks: usize, mut done: F) -> Option<usize>
    where
        F: FnMut(&World) -> bool,
    {
        for ran in 0..max_ticks {
            if done(world) {
                return Some(ran);
            }
            self.tick(world);
        }
        done(world).then_some(max_ticks)
    }
}

use bevy_ecs::prelude::Resource;

/// Default length of one simulated day, in simulated seconds.
pub const DEFAULT_DAY_LENGTH_SECS: f64 = 600.0;

/// Frames longer than this are treated as a stall (e.g. a backgrounded
/// window) and skipped instead of simulated.
pub const DEFAULT_MAX_FRAME_SECS: f32 = 0.25;

/// Why [`SimulationClock::advance`] declined to run a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSkip {
    Paused,
    FrameTooLong,
}

#[derive(Debug, Clone, Resource)]
pub struct SimulationClock {
    now: f64,
    tick: u64,
    last_dt: f32,
    paused: bool,
    day_length_secs: f64,
    /// Offset into the day at time zero, as a fraction in `[0, 1)`.
    day_start_fraction: f64,
    max_frame_secs: f32,
    skipped: u64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            now: 0.0,
            tick: 0,
            last_dt: 0.0,
            paused: false,
            day_length_secs: DEFAULT_DAY_LENGTH_SECS,
            day_start_fraction: 8.0 / 24.0,
            max_frame_secs: DEFAULT_MAX_FRAME_SECS,
            skipped: 0,
        }
    }
}

impl SimulationClock {
    pub fn new(day_length_secs: f64, start_hour: f64, max_frame_secs: f32) -> Self {
        Self {
            day_length_secs: day_length_secs.max(1.0),
            day_start_fraction: (start_hour / 24.0).rem_euclid(1.0),
            max_frame_secs,
            ..Self::default()
        }
    }

    /// Simulated seconds since start.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Step size of the most recent tick.
    pub fn dt(&self) -> f32 {
        self.last_dt
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped
    }

    /// Advance by one frame. Returns the step to simulate, or why the tick is skipped.
    pub fn advance(&mut self, frame_secs: f32) -> Result<f32, TickSkip> {
        if self.paused {
            self.skipped += 1;
            return Err(TickSkip::Paused);
        }
        if !(frame_secs > 0.0) || frame_secs > self.max_frame_secs {
            self.skipped += 1;
            return Err(TickSkip::FrameTooLong);
        }
        self.now += f64::from(frame_secs);
        self.tick += 1;
        self.last_dt = frame_secs;
        Ok(frame_secs)
    }

    /// Hour of day in `[0, 24)`.
    pub fn hour_of_day(&self) -> f64 {
        let fraction = (self.day_start_fraction + self.now / self.day_length_secs).rem_euclid(1.0);
        fraction * 24.0
    }
}

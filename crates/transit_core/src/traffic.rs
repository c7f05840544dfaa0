//! Traffic model: time-of-day profiles, local congestion, and ambient-vehicle
//! destination choice.
//!
//! Profiles are 24 hourly multipliers. Three are used: bus speed, ambient
//! traffic density (fraction of the population cap), and passenger demand
//! (spawn rate multiplier).

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{GridPos, RoadGrid};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum TrafficProfileKind {
    /// Every hour is 1.0.
    #[default]
    Flat,
    /// Morning and evening peaks.
    Commuter,
    /// Custom per-hour factors (index 0 = midnight).
    Custom([f32; 24]),
}

/// Hourly multipliers for one quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct HourlyProfile {
    pub hourly_factors: [f32; 24],
}

impl HourlyProfile {
    pub fn flat() -> Self {
        Self {
            hourly_factors: [1.0; 24],
        }
    }

    pub fn factor_at(&self, hour_of_day: f64) -> f32 {
        let hour = (hour_of_day.rem_euclid(24.0).floor() as usize).min(23);
        self.hourly_factors[hour]
    }
}

/// The three time-of-day curves consumed by the tick.
#[derive(Clone, Debug, Resource)]
pub struct TrafficProfile {
    pub bus_speed: HourlyProfile,
    pub traffic_density: HourlyProfile,
    pub passenger_demand: HourlyProfile,
}

impl TrafficProfile {
    pub fn flat() -> Self {
        Self {
            bus_speed: HourlyProfile::flat(),
            traffic_density: HourlyProfile::flat(),
            passenger_demand: HourlyProfile::flat(),
        }
    }

    /// Rush hours at 07–09 and 16–19: more cars, more riders, slower buses.
    pub fn commuter() -> Self {
        let mut speed = [1.0_f32; 24];
        let mut density = [0.5_f32; 24];
        let mut demand = [0.6_f32; 24];
        for h in 0..6 {
            density[h] = 0.15;
            demand[h] = 0.2;
        }
        for h in [7, 8, 16, 17, 18] {
            speed[h] = 0.7;
            density[h] = 1.0;
            demand[h] = 1.6;
        }
        for slot in &mut speed[9..16] {
            *slot = 0.85;
        }
        for h in 9..16 {
            density[h] = 0.7;
            demand[h] = 1.0;
        }
        Self {
            bus_speed: HourlyProfile {
                hourly_factors: speed,
            },
            traffic_density: HourlyProfile {
                hourly_factors: density,
            },
            passenger_demand: HourlyProfile {
                hourly_factors: demand,
            },
        }
    }

    /// `Custom` factors drive traffic density; bus speed and demand stay flat.
    pub fn from_kind(kind: &TrafficProfileKind) -> Self {
        match kind {
            TrafficProfileKind::Flat => Self::flat(),
            TrafficProfileKind::Commuter => Self::commuter(),
            TrafficProfileKind::Custom(factors) => Self {
                traffic_density: HourlyProfile {
                    hourly_factors: *factors,
                },
                ..Self::flat()
            },
        }
    }
}

/// Speed multiplier from the number of traffic vehicles near a bus.
///
/// Each vehicle costs `per_vehicle` of speed, up to `max_slowdown`.
pub fn congestion_multiplier(nearby_vehicles: usize, per_vehicle: f32, max_slowdown: f32) -> f32 {
    let slowdown = (nearby_vehicles as f32 * per_vehicle).min(max_slowdown.clamp(0.0, 1.0));
    1.0 - slowdown
}

/// Tuning for ambient destination choice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetargetParams {
    /// Tier one: ±45° cone, at least this many cells away.
    pub long_min_cells: f32,
    /// Tier two: ±60° cone, at least this many cells away.
    pub short_min_cells: f32,
    /// Share of candidates, by distance, treated as "far".
    pub far_fraction: f32,
    /// Probability of choosing from the far share.
    pub far_bias: f32,
}

impl Default for RetargetParams {
    fn default() -> Self {
        Self {
            long_min_cells: 8.0,
            short_min_cells: 3.0,
            far_fraction: 0.4,
            far_bias: 0.8,
        }
    }
}

/// Pick the next road cell for an ambient vehicle heading along `heading`
/// (radians). Candidates pass through progressively looser cones; an outright
/// reversal is never chosen. `None` means the vehicle is boxed in.
pub fn choose_destination<R: Rng + ?Sized>(
    rng: &mut R,
    grid: &RoadGrid,
    position: Vec2,
    heading: f32,
    params: &RetargetParams,
) -> Option<GridPos> {
    let here = grid.world_to_cell(position);
    let forward = Vec2::from_angle(heading);
    let scored: Vec<(GridPos, f32, f32)> = grid
        .road_cells()
        .filter(|c| *c != here)
        .map(|c| {
            let offset = (grid.cell_to_world(c) - position) / grid.cell_size();
            let dist = offset.length();
            let angle = if dist > f32::EPSILON {
                forward.angle_between(offset).abs()
            } else {
                0.0
            };
            (c, dist, angle)
        })
        .collect();

    let tiers = [
        (45_f32.to_radians(), params.long_min_cells),
        (60_f32.to_radians(), params.short_min_cells),
        (135_f32.to_radians(), 1.0),
    ];
    for (max_angle, min_dist) in tiers {
        let mut candidates: Vec<(GridPos, f32)> = scored
            .iter()
            .filter(|(_, d, a)| *a <= max_angle && *d >= min_dist)
            .map(|(c, d, _)| (*c, *d))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        let far_count = ((candidates.len() as f32 * params.far_fraction).ceil() as usize)
            .clamp(1, candidates.len());
        let pool = if rng.gen::<f32>() < params.far_bias {
            &candidates[candidates.len() - far_count..]
        } else {
            &candidates[..]
        };
        return Some(pool[rng.gen_range(0..pool.len())].0);
    }
    None
}

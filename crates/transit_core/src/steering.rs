//! Shared kinematics for buses and ambient traffic.
//!
//! Vehicles follow waypoint paths in keep-right lanes: the target is offset
//! to the right of the travel direction, estimated from a look-ahead waypoint.
//! Heading eases toward the target at a turn rate that rises with the sharpest
//! upcoming corner; speed eases toward the minimum of nominal, corner-limited
//! and obstacle-limited speeds.

use std::f32::consts::PI;

use bevy_ecs::prelude::Entity;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ecs::Motion;

/// Corners gentler than this do not slow a vehicle down.
const MIN_SIGNIFICANT_TURN: f32 = 0.35;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SteeringParams {
    /// Cruise speed in world units per second.
    pub nominal_speed: f32,
    /// Keep-right offset from the road centreline.
    pub lane_offset: f32,
    /// How many waypoints ahead to look for the lane direction.
    pub look_ahead: usize,
    /// Distance at which the current (offset) waypoint counts as reached.
    pub arrival_threshold: f32,
    /// Turn rate on straight roads, radians per second.
    pub base_turn_rate: f32,
    /// Turn rate when a U-turn is coming up.
    pub max_turn_rate: f32,
    /// Waypoints scanned for upcoming corners.
    pub turn_scan: usize,
    /// Corners farther than this do not slow the vehicle.
    pub turn_slow_distance: f32,
    /// Speed fraction kept when right on top of a right-angle (or sharper) corner.
    pub min_turn_speed_factor: f32,
    /// Obstacles farther than this are ignored.
    pub detection_radius: f32,
    /// Inside this gap the vehicle holds at the floor speed.
    pub safe_distance: f32,
    /// Speed fraction kept inside the safe distance.
    pub obstacle_floor: f32,
    /// Half-angle cosine of the forward detection cone.
    pub forward_cone_cos: f32,
    /// Heading cosine above which another vehicle counts as same-direction.
    pub same_direction_cos: f32,
    /// Speed change per second.
    pub acceleration: f32,
}

impl SteeringParams {
    pub fn bus() -> Self {
        Self {
            nominal_speed: 36.0,
            lane_offset: 2.5,
            look_ahead: 3,
            arrival_threshold: 6.0,
            base_turn_rate: 3.0,
            max_turn_rate: 9.0,
            turn_scan: 4,
            turn_slow_distance: 30.0,
            min_turn_speed_factor: 0.3,
            detection_radius: 28.0,
            safe_distance: 9.0,
            obstacle_floor: 0.0,
            forward_cone_cos: 0.8,
            same_direction_cos: 0.5,
            acceleration: 30.0,
        }
    }

    pub fn traffic() -> Self {
        Self {
            nominal_speed: 44.0,
            lane_offset: 2.5,
            arrival_threshold: 5.0,
            max_turn_rate: 10.0,
            detection_radius: 24.0,
            safe_distance: 7.0,
            acceleration: 40.0,
            ..Self::bus()
        }
    }
}

/// Another vehicle, as seen by the one being steered.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub entity: Entity,
    pub position: Vec2,
    pub heading: f32,
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Move `current` toward `target` by at most `max_step` radians.
pub fn ease_angle(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = wrap_angle(target - current);
    wrap_angle(current + diff.clamp(-max_step, max_step))
}

/// Turn angle at `path[i]` between the incoming and outgoing segments.
fn turn_angle_at(path: &[Vec2], prev: Vec2, i: usize) -> f32 {
    let Some(next) = path.get(i + 1) else {
        return 0.0;
    };
    let before = if i == 0 { prev } else { path[i - 1] };
    let incoming = path[i] - before;
    let outgoing = *next - path[i];
    if incoming.length_squared() < f32::EPSILON || outgoing.length_squared() < f32::EPSILON {
        return 0.0;
    }
    incoming.angle_between(outgoing).abs()
}

/// Lane target for the current waypoint: offset to the right of the travel
/// direction taken toward a look-ahead waypoint.
pub fn lane_target(position: Vec2, motion: &Motion, params: &SteeringParams) -> Option<Vec2> {
    let target = *motion.path.get(motion.cursor)?;
    let ahead_index = (motion.cursor + params.look_ahead).min(motion.path.len() - 1);
    let ahead = motion.path[ahead_index];
    let mut direction = (ahead - position).normalize_or_zero();
    if direction == Vec2::ZERO {
        direction = (target - position).normalize_or_zero();
    }
    if direction == Vec2::ZERO {
        direction = Vec2::from_angle(motion.heading);
    }
    let right = Vec2::new(-direction.y, direction.x);
    Some(target + right * params.lane_offset)
}

/// Speed fraction for the closest same-direction vehicle ahead.
pub fn obstacle_factor(
    me: Entity,
    position: Vec2,
    heading: f32,
    obstacles: &[Obstacle],
    params: &SteeringParams,
) -> f32 {
    let forward = Vec2::from_angle(heading);
    let mut closest: Option<f32> = None;
    for other in obstacles {
        if other.entity == me {
            continue;
        }
        let to_other = other.position - position;
        let dist = to_other.length();
        if dist > params.detection_radius || dist < f32::EPSILON {
            continue;
        }
        let ahead = forward.dot(to_other) / dist;
        if ahead < params.forward_cone_cos {
            continue;
        }
        if forward.dot(Vec2::from_angle(other.heading)) < params.same_direction_cos {
            continue;
        }
        closest = Some(closest.map_or(dist, |c: f32| c.min(dist)));
    }
    match closest {
        None => 1.0,
        Some(d) if d <= params.safe_distance => params.obstacle_floor,
        Some(d) => {
            let span = (params.detection_radius - params.safe_distance).max(f32::EPSILON);
            let t = ((d - params.safe_distance) / span).clamp(0.0, 1.0);
            params.obstacle_floor + (1.0 - params.obstacle_floor) * t
        }
    }
}

/// One kinematic step. `speed_scale` multiplies the nominal speed (time of
/// day, congestion, stop approach). Returns `true` once the path is finished.
pub fn steer(
    me: Entity,
    position: &mut Vec2,
    motion: &mut Motion,
    params: &SteeringParams,
    obstacles: &[Obstacle],
    speed_scale: f32,
    dt: f32,
) -> bool {
    let Some(target) = lane_target(*position, motion, params) else {
        motion.speed = 0.0;
        return true;
    };

    let to_target = target - *position;
    let desired = if to_target.length_squared() > f32::EPSILON {
        to_target.y.atan2(to_target.x)
    } else {
        motion.heading
    };

    // Sharpest corner and the first significant corner within the scan window.
    let scan_end = (motion.cursor + params.turn_scan).min(motion.path.len());
    let mut sharpest = 0.0_f32;
    let mut first_corner: Option<(f32, f32)> = None;
    for i in motion.cursor..scan_end {
        let angle = turn_angle_at(&motion.path, *position, i);
        sharpest = sharpest.max(angle);
        if first_corner.is_none() && angle > MIN_SIGNIFICANT_TURN {
            first_corner = Some((angle, position.distance(motion.path[i])));
        }
    }

    let heading_error = wrap_angle(desired - motion.heading).abs();
    let turn_rate = params.base_turn_rate
        + (params.max_turn_rate - params.base_turn_rate) * (sharpest.max(heading_error) / PI);
    motion.heading = ease_angle(motion.heading, desired, turn_rate * dt);

    let mut turn_factor = 1.0_f32;
    if let Some((angle, distance)) = first_corner {
        let proximity = (1.0 - distance / params.turn_slow_distance).clamp(0.0, 1.0);
        let severity = (angle / (PI * 0.5)).min(1.0);
        turn_factor = 1.0 - (1.0 - params.min_turn_speed_factor) * severity * proximity;
    }
    // Slow down while pointing away from the target so the vehicle cannot orbit it.
    let alignment = wrap_angle(desired - motion.heading).cos();
    turn_factor = turn_factor.min(alignment.max(params.min_turn_speed_factor * 0.5));

    let avoid = obstacle_factor(me, *position, motion.heading, obstacles, params);
    let target_speed = params.nominal_speed * speed_scale.max(0.0) * turn_factor.min(avoid);
    let max_delta = params.acceleration * dt;
    motion.speed += (target_speed - motion.speed).clamp(-max_delta, max_delta);
    motion.speed = motion.speed.max(0.0);

    *position += Vec2::from_angle(motion.heading) * motion.speed * dt;

    let raw_target = motion.path[motion.cursor];
    if position.distance(target) <= params.arrival_threshold
        || position.distance(raw_target) <= params.arrival_threshold
    {
        motion.cursor += 1;
    }
    motion.cursor >= motion.path.len()
}

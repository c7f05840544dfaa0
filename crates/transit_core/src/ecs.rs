use std::sync::Arc;

use bevy_ecs::prelude::{Component, Entity};
use glam::Vec2;

use crate::grid::GridPos;
use crate::network::Stop;
use crate::planner::TransferPlan;

/// Continuous world position, shared by every agent kind.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Vec2);

/// Path-following state for buses and traffic vehicles.
#[derive(Debug, Clone, Component)]
pub struct Motion {
    /// Radians; `0` points along +x.
    pub heading: f32,
    pub speed: f32,
    pub path: Arc<[Vec2]>,
    pub cursor: usize,
}

impl Motion {
    pub fn idle(heading: f32) -> Self {
        Self {
            heading,
            speed: 0.0,
            path: Arc::from(Vec::new()),
            cursor: 0,
        }
    }

    pub fn set_path(&mut self, path: Arc<[Vec2]>) {
        self.path = path;
        self.cursor = 0;
    }

    pub fn clear_path(&mut self) {
        self.path = Arc::from(Vec::new());
        self.cursor = 0;
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn finished(&self) -> bool {
        self.cursor >= self.path.len()
    }

    pub fn final_waypoint(&self) -> Option<Vec2> {
        self.path.last().copied()
    }
}

/// Passenger lifecycle. `Traveling` carries the owning bus, so a riding
/// passenger always knows both its vehicle and where it gets off.
#[derive(Debug, Clone, PartialEq)]
pub enum NpcState {
    Walking { path: Arc<[Vec2]>, cursor: usize },
    Waiting { stop: Option<Stop> },
    Traveling { bus: Entity, alight_at: Stop },
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpcStateKind {
    Walking,
    Waiting,
    Traveling,
    Arrived,
}

impl NpcState {
    pub fn kind(&self) -> NpcStateKind {
        match self {
            NpcState::Walking { .. } => NpcStateKind::Walking,
            NpcState::Waiting { .. } => NpcStateKind::Waiting,
            NpcState::Traveling { .. } => NpcStateKind::Traveling,
            NpcState::Arrived => NpcStateKind::Arrived,
        }
    }

    /// The stop a waiting passenger is queued at.
    pub fn waiting_stop(&self) -> Option<Stop> {
        match self {
            NpcState::Waiting { stop } => *stop,
            _ => None,
        }
    }
}

/// A trip plan plus progress through it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePlan {
    pub plan: TransferPlan,
    /// Index into `plan.stops` of the stop the passenger is at (or heading for).
    pub cursor: usize,
}

impl ActivePlan {
    pub fn new(plan: TransferPlan) -> Self {
        Self { plan, cursor: 0 }
    }

    pub fn current_stop(&self) -> Option<Stop> {
        self.plan.stops.get(self.cursor).copied()
    }

    /// Route and alighting stop of the next leg.
    pub fn next_leg(&self) -> Option<(usize, Stop)> {
        let route = *self.plan.routes.get(self.cursor)?;
        let stop = *self.plan.stops.get(self.cursor + 1)?;
        Some((route, stop))
    }

    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(self.plan.stops.len().saturating_sub(1));
    }
}

#[derive(Debug, Clone, Component)]
pub struct Npc {
    pub id: u64,
    pub state: NpcState,
    pub origin_zone: usize,
    pub destination_zone: usize,
    /// Seconds spent waiting at stops so far this trip.
    pub wait_time: f32,
    /// Stop serving the destination zone.
    pub final_stop: Option<Stop>,
    pub plan: Option<ActivePlan>,
    /// Network revision the last planning attempt saw.
    pub planned_at_revision: Option<u64>,
    pub transfer_count: u32,
    /// Set on the first boarding of the trip.
    pub boarded_at: Option<f64>,
    pub spawned_at: f64,
    pub unreachable_logged: bool,
}

impl Npc {
    pub fn new(id: u64, origin_zone: usize, destination_zone: usize, walk: Arc<[Vec2]>, now: f64) -> Self {
        Self {
            id,
            state: NpcState::Walking {
                path: walk,
                cursor: 0,
            },
            origin_zone,
            destination_zone,
            wait_time: 0.0,
            final_stop: None,
            plan: None,
            planned_at_revision: None,
            transfer_count: 0,
            boarded_at: None,
            spawned_at: now,
            unreachable_logged: false,
        }
    }

    /// Back to waiting with no stop and no plan; the passenger re-acquires both.
    pub fn reset_to_waiting(&mut self) {
        self.state = NpcState::Waiting { stop: None };
        self.plan = None;
        self.planned_at_revision = None;
    }
}

#[derive(Debug, Clone, Component)]
pub struct Bus {
    pub route: usize,
    /// Index of the stop the bus is driving to or dwelling at.
    pub target_stop: usize,
    pub dwell_timer: f32,
    pub dwelling: bool,
    pub passengers: Vec<Entity>,
    pub capacity: usize,
    /// Set when the bus pulls in; taken by the boarding pass.
    pub pending_stop: Option<Stop>,
    pub stop_visits: u64,
    pub boarding_passes: u64,
}

impl Bus {
    pub fn new(route: usize, target_stop: usize, capacity: usize) -> Self {
        Self {
            route,
            target_stop,
            dwell_timer: 0.0,
            dwelling: false,
            passengers: Vec::with_capacity(capacity),
            capacity,
            pending_stop: None,
            stop_visits: 0,
            boarding_passes: 0,
        }
    }

    pub fn free_seats(&self) -> usize {
        self.capacity.saturating_sub(self.passengers.len())
    }
}

#[derive(Debug, Clone, Default, Component)]
pub struct TrafficVehicle {
    pub destination: Option<GridPos>,
    /// No forward destination was available at the last re-target; the
    /// population system moves it elsewhere on the next tick.
    pub stalled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_cursor_walks_legs() {
        let mut active = ActivePlan::new(TransferPlan {
            stops: vec![Stop::new(0, 0), Stop::new(3, 0), Stop::new(3, 4)],
            routes: vec![0, 1],
            transfers: 1,
        });
        assert_eq!(active.next_leg(), Some((0, Stop::new(3, 0))));
        active.advance();
        assert_eq!(active.current_stop(), Some(Stop::new(3, 0)));
        assert_eq!(active.next_leg(), Some((1, Stop::new(3, 4))));
        active.advance();
        active.advance();
        assert_eq!(active.current_stop(), Some(Stop::new(3, 4)));
        assert_eq!(active.next_leg(), None);
    }
}

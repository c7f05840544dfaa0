//! Operational statistics and the per-tick render snapshot.

use std::collections::VecDeque;
use std::sync::Arc;

use bevy_ecs::prelude::{Entity, Resource};
use glam::Vec2;

use crate::ecs::{Npc, NpcState, NpcStateKind};
use crate::grid::{RoadGrid, Zone};
use crate::network::Stop;

/// Counters consumed by scoring. Only the core increments them.
#[derive(Debug, Clone, Resource)]
pub struct TransitStats {
    pub trips_completed: u64,
    /// Completed trips that never boarded a bus.
    pub walk_only_trips: u64,
    pub give_ups: u64,
    /// Passengers dropped after a failed reference recovery.
    pub dropped_passengers: u64,
    pub total_wait_secs: f64,
    pub total_transit_secs: f64,
    pub revenue: f64,
    /// Rolling fleet utilisation (onboard / capacity) samples.
    pub utilization: VecDeque<f32>,
    max_samples: usize,
    pub last_sample_at: Option<f64>,
}

impl Default for TransitStats {
    fn default() -> Self {
        Self::new(600)
    }
}

impl TransitStats {
    pub fn new(max_samples: usize) -> Self {
        Self {
            trips_completed: 0,
            walk_only_trips: 0,
            give_ups: 0,
            dropped_passengers: 0,
            total_wait_secs: 0.0,
            total_transit_secs: 0.0,
            revenue: 0.0,
            utilization: VecDeque::new(),
            max_samples: max_samples.max(1),
            last_sample_at: None,
        }
    }

    /// Mark the passenger arrived and book the trip. A passenger already in
    /// `Arrived` is left untouched, so a trip is never counted twice.
    pub fn record_arrival(&mut self, npc: &mut Npc, now: f64, ticket_price: f64) -> bool {
        if npc.state == NpcState::Arrived {
            return false;
        }
        npc.state = NpcState::Arrived;
        self.trips_completed += 1;
        self.total_wait_secs += f64::from(npc.wait_time);
        match npc.boarded_at {
            Some(boarded_at) => {
                self.total_transit_secs += (now - boarded_at).max(0.0);
                self.revenue += ticket_price;
            }
            None => self.walk_only_trips += 1,
        }
        true
    }

    pub fn record_give_up(&mut self, npc: &Npc) {
        self.give_ups += 1;
        self.total_wait_secs += f64::from(npc.wait_time);
    }

    pub fn push_utilization(&mut self, sample: f32, now: f64) {
        if self.utilization.len() == self.max_samples {
            self.utilization.pop_front();
        }
        self.utilization.push_back(sample);
        self.last_sample_at = Some(now);
    }

    pub fn average_wait_secs(&self) -> f64 {
        let n = self.trips_completed + self.give_ups;
        if n == 0 {
            0.0
        } else {
            self.total_wait_secs / n as f64
        }
    }

    pub fn average_transit_secs(&self) -> f64 {
        let riders = self.trips_completed - self.walk_only_trips;
        if riders == 0 {
            0.0
        } else {
            self.total_transit_secs / riders as f64
        }
    }

    pub fn average_utilization(&self) -> f32 {
        if self.utilization.is_empty() {
            0.0
        } else {
            self.utilization.iter().sum::<f32>() / self.utilization.len() as f32
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    pub name: String,
    pub color: [u8; 3],
    pub stops: Vec<Stop>,
    pub bus_count: usize,
    pub ridership: u64,
}

#[derive(Debug, Clone)]
pub struct BusSnapshot {
    pub entity: Entity,
    pub route: usize,
    pub position: Vec2,
    pub heading: f32,
    pub passengers: usize,
    pub dwelling: bool,
}

#[derive(Debug, Clone)]
pub struct NpcSnapshot {
    pub entity: Entity,
    pub id: u64,
    pub state: NpcStateKind,
    pub position: Vec2,
    pub transfers: u32,
}

#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub entity: Entity,
    pub position: Vec2,
    pub heading: f32,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct SimSnapshot {
    pub time: f64,
    pub tick: u64,
    pub hour_of_day: f64,
    pub grid: Arc<RoadGrid>,
    pub zones: Arc<Vec<Zone>>,
    pub routes: Vec<RouteSnapshot>,
    pub buses: Vec<BusSnapshot>,
    pub npcs: Vec<NpcSnapshot>,
    pub traffic: Vec<VehicleSnapshot>,
}

impl SimSnapshot {
    pub fn count_npcs(&self, state: NpcStateKind) -> usize {
        self.npcs.iter().filter(|n| n.state == state).count()
    }
}

#[derive(Debug, Default, Resource)]
pub struct LatestSnapshot(pub Option<SimSnapshot>);

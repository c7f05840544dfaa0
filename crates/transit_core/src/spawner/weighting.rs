use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{Zone, ZoneKind};

/// Relative weight of each zone kind as a trip origin and as a destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneWeights {
    pub origin: KindWeights,
    pub destination: KindWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindWeights {
    pub residential: f32,
    pub commercial: f32,
    pub industrial: f32,
}

impl KindWeights {
    pub fn weight(&self, kind: ZoneKind) -> f32 {
        match kind {
            ZoneKind::Residential => self.residential,
            ZoneKind::Commercial => self.commercial,
            ZoneKind::Industrial => self.industrial,
        }
    }
}

impl Default for ZoneWeights {
    fn default() -> Self {
        Self {
            origin: KindWeights {
                residential: 6.0,
                commercial: 2.0,
                industrial: 1.0,
            },
            destination: KindWeights {
                residential: 1.0,
                commercial: 5.0,
                industrial: 3.0,
            },
        }
    }
}

fn pick_weighted<R: Rng + ?Sized>(
    rng: &mut R,
    zones: &[Zone],
    weights: &KindWeights,
    exclude: Option<usize>,
) -> Option<usize> {
    let table: Vec<f32> = zones
        .iter()
        .enumerate()
        .map(|(i, z)| {
            if Some(i) == exclude {
                0.0
            } else {
                weights.weight(z.kind).max(0.0)
            }
        })
        .collect();
    let dist = WeightedIndex::new(&table).ok()?;
    Some(dist.sample(rng))
}

impl ZoneWeights {
    /// Weighted (origin, destination) pair with distinct zones. `None` when
    /// fewer than two zones carry weight.
    pub fn choose_trip<R: Rng + ?Sized>(&self, rng: &mut R, zones: &[Zone]) -> Option<(usize, usize)> {
        let origin = pick_weighted(rng, zones, &self.origin, None)?;
        let destination = pick_weighted(rng, zones, &self.destination, Some(origin))?;
        Some((origin, destination))
    }
}

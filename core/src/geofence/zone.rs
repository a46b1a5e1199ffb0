use serde::{Deserialize, Serialize};

/// Feed coordinates are millimetres; zone radius and reported distances are metres.
pub const MILLIMETRES_PER_METRE: f64 = 1000.0;

/// Circular no-fly zone. The origin is in feed units, the radius in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoFlyZone {
    pub origin_x: f64,
    pub origin_y: f64,
    pub radius_m: f64,
}

/// Result of testing one position against the zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub violating: bool,
    pub distance_m: f64,
}

impl NoFlyZone {
    pub fn new(origin_x: f64, origin_y: f64, radius_m: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            radius_m,
        }
    }

    pub fn distance_m(&self, x: f64, y: f64) -> f64 {
        (self.origin_x - x).hypot(self.origin_y - y) / MILLIMETRES_PER_METRE
    }

    /// A position on the boundary counts as violating.
    pub fn evaluate(&self, x: f64, y: f64) -> Verdict {
        let distance_m = self.distance_m(x, y);
        Verdict {
            violating: distance_m <= self.radius_m,
            distance_m,
        }
    }
}

impl Default for NoFlyZone {
    fn default() -> Self {
        Self::new(250_000.0, 250_000.0, 100.0)
    }
}

use super::pilot::Pilot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracked state for a drone currently or recently inside the no-fly zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub drone_id: String,
    pub pilot: Pilot,
    pub closest_distance_m: f64,
    pub last_touched: DateTime<Utc>,
}

impl Violation {
    pub fn first_sighting(
        drone_id: impl Into<String>,
        pilot: Pilot,
        distance_m: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            drone_id: drone_id.into(),
            pilot,
            closest_distance_m: distance_m,
            last_touched: at,
        }
    }

    /// Folds a new sighting into the record. Distance only shrinks and the
    /// touch time only moves forward.
    pub fn merged(&self, distance_m: f64, at: DateTime<Utc>) -> Self {
        Self {
            drone_id: self.drone_id.clone(),
            pilot: self.pilot.clone(),
            closest_distance_m: self.closest_distance_m.min(distance_m),
            last_touched: self.last_touched.max(at),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn pilot(first_name: &str) -> Pilot {
        Pilot {
            pilot_id: format!("P-{}", first_name),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            phone_number: "+123".to_string(),
            email: format!("{}@email.com", first_name.to_lowercase()),
            created_dt: Utc::now(),
        }
    }

    pub fn violation(drone_id: &str, distance_m: f64, at: DateTime<Utc>) -> Violation {
        Violation::first_sighting(drone_id, pilot("Bob"), distance_m, at)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One drone sighting inside a report. Coordinates are in feed units (millimetres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub drone_id: String,
    pub x: f64,
    pub y: f64,
}

impl PositionSample {
    pub fn new(drone_id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            drone_id: drone_id.into(),
            x,
            y,
        }
    }
}

/// Snapshot of every drone the sensor currently sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    pub captured_at: DateTime<Utc>,
    pub samples: Vec<PositionSample>,
}

impl PositionReport {
    pub fn new(captured_at: DateTime<Utc>, samples: Vec<PositionSample>) -> Self {
        Self {
            captured_at,
            samples,
        }
    }

    /// Report used in place of a failed fetch.
    pub fn empty() -> Self {
        Self::new(Utc::now(), Vec::new())
    }
}

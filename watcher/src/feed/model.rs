use birdnestcore::model::{PositionReport, PositionSample};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `<report>` document published by the drone sensor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub capture: CaptureDocument,
}

#[derive(Debug, Deserialize)]
pub struct CaptureDocument {
    #[serde(rename = "@snapshotTimestamp")]
    pub snapshot_timestamp: DateTime<Utc>,
    #[serde(rename = "drone", default)]
    pub drones: Vec<DroneDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneDocument {
    pub serial_number: String,
    pub position_y: f64,
    pub position_x: f64,
}

impl From<DroneDocument> for PositionSample {
    fn from(drone: DroneDocument) -> Self {
        PositionSample::new(drone.serial_number, drone.position_x, drone.position_y)
    }
}

impl From<ReportDocument> for PositionReport {
    fn from(document: ReportDocument) -> Self {
        let capture = document.capture;
        PositionReport::new(
            capture.snapshot_timestamp,
            capture.drones.into_iter().map(PositionSample::from).collect(),
        )
    }
}

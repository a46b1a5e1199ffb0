use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered operator of a drone, as published by the pilot registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilot {
    pub pilot_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub created_dt: DateTime<Utc>,
}

impl Pilot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

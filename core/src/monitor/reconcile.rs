use crate::geofence::NoFlyZone;
use crate::model::{PositionSample, Violation};
use crate::prelude::PilotDirectory;
use crate::store::ViolationStore;
use chrono::{DateTime, Utc};
use log::warn;
use std::sync::Arc;

/// What a per-drone evaluation task did during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Outside,
    Created,
    Refreshed,
    /// Violating, but the pilot could not be resolved; nothing was stored.
    Unresolved,
    StoreFailed,
}

/// Evaluates single sightings against the zone and folds them into the store.
pub(crate) struct Reconciler {
    zone: NoFlyZone,
    pilots: Arc<dyn PilotDirectory>,
    store: Arc<dyn ViolationStore>,
}

impl Reconciler {
    pub(crate) fn new(
        zone: NoFlyZone,
        pilots: Arc<dyn PilotDirectory>,
        store: Arc<dyn ViolationStore>,
    ) -> Self {
        Self {
            zone,
            pilots,
            store,
        }
    }

    pub(crate) async fn reconcile(
        &self,
        sample: PositionSample,
        tick_at: DateTime<Utc>,
    ) -> Outcome {
        let verdict = self.zone.evaluate(sample.x, sample.y);
        if !verdict.violating {
            return Outcome::Outside;
        }

        let existing = match self.store.get(&sample.drone_id).await {
            Ok(existing) => existing,
            Err(err) => {
                warn!("lookup for drone {} failed: {}", sample.drone_id, err);
                return Outcome::StoreFailed;
            }
        };

        let (record, outcome) = match existing {
            Some(previous) => (
                previous.merged(verdict.distance_m, tick_at),
                Outcome::Refreshed,
            ),
            None => match self.pilots.resolve(&sample.drone_id).await {
                Ok(pilot) => (
                    Violation::first_sighting(
                        sample.drone_id.clone(),
                        pilot,
                        verdict.distance_m,
                        tick_at,
                    ),
                    Outcome::Created,
                ),
                Err(err) => {
                    warn!("pilot for drone {} unavailable: {}", sample.drone_id, err);
                    return Outcome::Unresolved;
                }
            },
        };

        if let Err(err) = self.store.upsert(&sample.drone_id, record).await {
            warn!("dropping update for drone {}: {}", sample.drone_id, err);
            return Outcome::StoreFailed;
        }
        outcome
    }
}

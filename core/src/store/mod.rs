pub mod changes;
pub mod local;
pub mod recency;
pub mod remote;

pub use changes::ChangeFlag;
pub use local::LocalStore;
pub use recency::RecencyQueue;
pub use remote::RemoteStore;

use crate::model::Violation;
use crate::prelude::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Recency-ordered violation registry with time-based expiry.
///
/// Both backends expose the same observable behaviour: `as_slice` is ordered
/// most recently touched first and `has_changes` is edge-triggered.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    async fn get(&self, drone_id: &str) -> StoreResult<Option<Violation>>;

    /// Inserts or replaces the record and promotes it to the front. The caller
    /// merges with any previous record first.
    async fn upsert(&self, drone_id: &str, violation: Violation) -> StoreResult<()>;

    /// Drops records whose `now - last_touched` exceeds the retention.
    /// Returns how many were removed.
    async fn evict_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    async fn as_slice(&self) -> StoreResult<Vec<Violation>>;

    /// True at most once per batch of mutations.
    fn has_changes(&self) -> bool;

    /// Re-arms the change flag, e.g. after a snapshot could not be delivered.
    fn mark_changed(&self);

    async fn destroy(&self);
}

/// Construction-time choice of store implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Local,
    Remote { url: String },
}

/// Opens the configured backend. Must be called from within a tokio runtime.
pub async fn open_store(
    backend: &StoreBackend,
    retention: Duration,
) -> StoreResult<Arc<dyn ViolationStore>> {
    match backend {
        StoreBackend::Local => {
            let store = LocalStore::start(retention, local::DEFAULT_SWEEP_INTERVAL)?;
            log::info!("using in-process violation store (retention {:?})", retention);
            Ok(Arc::new(store))
        }
        StoreBackend::Remote { url } => {
            let store = RemoteStore::connect(url, retention).await?;
            log::info!("using redis violation store at {}", url);
            Ok(Arc::new(store))
        }
    }
}

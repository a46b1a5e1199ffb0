use super::changes::ChangeFlag;
use super::recency::RecencyQueue;
use super::ViolationStore;
use crate::model::Violation;
use crate::prelude::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

struct Shared {
    entries: RwLock<RecencyQueue<Violation>>,
    changes: ChangeFlag,
    retention: TimeDelta,
}

impl Shared {
    /// Trims expired entries from the back of the queue. The queue is ordered by
    /// touch time, so the scan ends at the first entry still within retention.
    fn evict_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let mut evicted = 0;
        loop {
            let expired = match entries.back() {
                Some((_, oldest)) => {
                    now.signed_duration_since(oldest.last_touched) > self.retention
                }
                None => false,
            };
            if !expired {
                break;
            }
            entries.pop_back();
            evicted += 1;
        }
        if evicted > 0 {
            self.changes.mark();
        }
        Ok(evicted)
    }
}

/// In-process store. One `RwLock` guards both the index and the recency
/// order; a background task sweeps expired entries on its own timer.
pub struct LocalStore {
    shared: Arc<Shared>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl LocalStore {
    /// Creates the store and spawns its sweeper on the current tokio runtime.
    pub fn start(retention: Duration, sweep_interval: Duration) -> StoreResult<Self> {
        let retention_delta =
            TimeDelta::from_std(retention).map_err(|_| StoreError::InvalidRetention(retention))?;
        let shared = Arc::new(Shared {
            entries: RwLock::new(RecencyQueue::new()),
            changes: ChangeFlag::new(),
            retention: retention_delta,
        });

        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(sweep(Arc::clone(&shared), sweep_interval, stop_rx));

        Ok(Self {
            shared,
            stop: Mutex::new(Some(stop_tx)),
        })
    }

    pub fn len(&self) -> StoreResult<usize> {
        let entries = self.shared.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

async fn sweep(shared: Arc<Shared>, every: Duration, mut stop: oneshot::Receiver<()>) {
    let every = every.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => match shared.evict_expired(Utc::now()) {
                Ok(0) => {}
                Ok(evicted) => debug!("background sweep expired {} violations", evicted),
                Err(err) => {
                    warn!("background sweep stopped: {}", err);
                    break;
                }
            },
        }
    }
}

#[async_trait]
impl ViolationStore for LocalStore {
    async fn get(&self, drone_id: &str) -> StoreResult<Option<Violation>> {
        let entries = self.shared.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(drone_id).cloned())
    }

    async fn upsert(&self, drone_id: &str, violation: Violation) -> StoreResult<()> {
        let mut entries = self.shared.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.upsert(drone_id, violation);
        self.shared.changes.mark();
        Ok(())
    }

    async fn evict_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.shared.evict_expired(now)
    }

    async fn as_slice(&self) -> StoreResult<Vec<Violation>> {
        let entries = self.shared.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.iter().map(|(_, violation)| violation.clone()).collect())
    }

    fn has_changes(&self) -> bool {
        self.shared.changes.take()
    }

    fn mark_changed(&self) {
        self.shared.changes.mark();
    }

    async fn destroy(&self) {
        let sender = match self.stop.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
        if let Ok(mut entries) = self.shared.entries.write() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::violation::fixtures::violation;
    use chrono::Duration as ChronoDuration;

    const IDLE_SWEEP: Duration = Duration::from_secs(3600);

    fn ids(snapshot: &[Violation]) -> Vec<&str> {
        snapshot.iter().map(|v| v.drone_id.as_str()).collect()
    }

    #[tokio::test]
    async fn get_returns_upserted_record() {
        let store = LocalStore::start(Duration::from_secs(600), IDLE_SWEEP).unwrap();
        let now = Utc::now();
        store.upsert("123", violation("123", 50.0, now)).await.unwrap();

        let found = store.get("123").await.unwrap().unwrap();
        assert_eq!(found.closest_distance_m, 50.0);
        assert!(store.get("456").await.unwrap().is_none());
        store.destroy().await;
    }

    #[tokio::test]
    async fn snapshot_is_most_recent_first() {
        let store = LocalStore::start(Duration::from_secs(600), IDLE_SWEEP).unwrap();
        let now = Utc::now();
        store.upsert("a", violation("a", 10.0, now)).await.unwrap();
        store.upsert("b", violation("b", 10.0, now)).await.unwrap();
        store.upsert("a", violation("a", 5.0, now)).await.unwrap();

        let snapshot = store.as_slice().await.unwrap();
        assert_eq!(ids(&snapshot), vec!["a", "b"]);
        assert_eq!(snapshot[0].closest_distance_m, 5.0);
        store.destroy().await;
    }

    #[tokio::test]
    async fn eviction_removes_only_expired_records() {
        let store = LocalStore::start(Duration::from_secs(10), IDLE_SWEEP).unwrap();
        let t0 = Utc::now();
        store.upsert("a", violation("a", 1.0, t0)).await.unwrap();
        store
            .upsert("b", violation("b", 1.0, t0 + ChronoDuration::seconds(10)))
            .await
            .unwrap();
        store
            .upsert("c", violation("c", 1.0, t0 + ChronoDuration::seconds(20)))
            .await
            .unwrap();

        // b sits exactly on the retention boundary and stays.
        let evicted = store
            .evict_expired(t0 + ChronoDuration::seconds(20))
            .await
            .unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(ids(&store.as_slice().await.unwrap()), vec!["c", "b"]);
        store.destroy().await;
    }

    #[tokio::test]
    async fn sweep_stops_at_first_fresh_entry() {
        let store = LocalStore::start(Duration::from_secs(20), IDLE_SWEEP).unwrap();
        let t0 = Utc::now();
        store
            .upsert("fresh", violation("fresh", 1.0, t0 + ChronoDuration::seconds(100)))
            .await
            .unwrap();
        store.upsert("stale", violation("stale", 1.0, t0)).await.unwrap();

        let evicted = store
            .evict_expired(t0 + ChronoDuration::seconds(50))
            .await
            .unwrap();
        assert_eq!(evicted, 0);
        assert_eq!(store.len().unwrap(), 2);
        store.destroy().await;
    }

    #[tokio::test]
    async fn zero_retention_expires_after_any_elapsed_time() {
        let store = LocalStore::start(Duration::ZERO, IDLE_SWEEP).unwrap();
        let t0 = Utc::now();
        store.upsert("123", violation("123", 1.0, t0)).await.unwrap();

        assert_eq!(store.evict_expired(t0).await.unwrap(), 0);
        assert_eq!(
            store
                .evict_expired(t0 + ChronoDuration::milliseconds(1))
                .await
                .unwrap(),
            1
        );
        assert!(store.is_empty().unwrap());
        store.destroy().await;
    }

    #[tokio::test]
    async fn changes_are_edge_triggered() {
        let store = LocalStore::start(Duration::from_secs(10), IDLE_SWEEP).unwrap();
        assert!(!store.has_changes());

        let t0 = Utc::now();
        store.upsert("a", violation("a", 1.0, t0)).await.unwrap();
        store.upsert("b", violation("b", 1.0, t0)).await.unwrap();
        assert!(store.has_changes());
        assert!(!store.has_changes());

        assert_eq!(store.evict_expired(t0).await.unwrap(), 0);
        assert!(!store.has_changes());

        store
            .evict_expired(t0 + ChronoDuration::seconds(11))
            .await
            .unwrap();
        assert!(store.has_changes());
        assert!(!store.has_changes());
        store.destroy().await;
    }

    #[tokio::test]
    async fn background_sweep_expires_records() {
        let store = LocalStore::start(Duration::ZERO, Duration::from_millis(5)).unwrap();
        let stale = Utc::now() - ChronoDuration::seconds(1);
        store.upsert("123", violation("123", 1.0, stale)).await.unwrap();
        assert!(store.has_changes());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.is_empty().unwrap());
        assert!(store.has_changes());
        store.destroy().await;
    }

    #[tokio::test]
    async fn concurrent_upserts_are_not_lost() {
        let store = Arc::new(LocalStore::start(Duration::from_secs(600), IDLE_SWEEP).unwrap());
        let now = Utc::now();
        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..64 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                let id = format!("drone-{}", n);
                store.upsert(&id, violation(&id, 1.0, now)).await.unwrap();
            });
        }
        while tasks.join_next().await.is_some() {}

        assert_eq!(store.len().unwrap(), 64);
        store.destroy().await;
    }

    #[tokio::test]
    async fn destroy_does_not_hang_and_releases_entries() {
        let store = LocalStore::start(Duration::from_secs(10), Duration::from_millis(1)).unwrap();
        store
            .upsert("a", violation("a", 1.0, Utc::now()))
            .await
            .unwrap();
        store.destroy().await;
        store.destroy().await;
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn out_of_range_retention_is_rejected() {
        assert!(matches!(
            LocalStore::start(Duration::MAX, IDLE_SWEEP),
            Err(StoreError::InvalidRetention(_))
        ));
    }
}

use super::changes::ChangeFlag;
use super::ViolationStore;
use crate::model::Violation;
use crate::prelude::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, warn};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

const VALUE_PREFIX: &str = "birdnest:violation:";
const QUEUE_KEY: &str = "birdnest:recency";

fn value_key(drone_id: &str) -> String {
    format!("{}{}", VALUE_PREFIX, drone_id)
}

/// Redis-backed store. Each record is a JSON value with a native expiry; the
/// sorted set `birdnest:recency` (score = last touch in epoch millis) gives
/// the snapshot order. Expiry is observed through keyspace notifications,
/// which prune the sorted set and raise the change flag. The per-tick
/// eviction pass prunes by score as well, so a lost notification stream only
/// delays removal until the next tick.
pub struct RemoteStore {
    conn: MultiplexedConnection,
    retention_ms: u64,
    changes: Arc<ChangeFlag>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl RemoteStore {
    /// Connects, enables expiry notifications and clears any records left by
    /// a previous run. Fails if the server is unreachable or refuses the
    /// notification config.
    pub async fn connect(url: &str, retention: Duration) -> StoreResult<Self> {
        // PSETEX rejects zero, so zero retention expires after one millisecond.
        let retention_ms = u64::try_from(retention.as_millis())
            .map_err(|_| StoreError::InvalidRetention(retention))?
            .max(1);

        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("Ex")
            .query_async(&mut conn)
            .await?;
        reset_namespace(&mut conn).await?;

        let channel = format!(
            "__keyevent@{}__:expired",
            client.get_connection_info().redis.db
        );
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.psubscribe(&channel).await?;

        let changes = Arc::new(ChangeFlag::new());
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let mut index_conn = conn.clone();
        let expiry_changes = Arc::clone(&changes);

        tokio::spawn(async move {
            let mut messages = Box::pin(pubsub.into_on_message());
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    message = messages.next() => {
                        let Some(message) = message else {
                            warn!("expiry notification stream closed, relying on tick eviction");
                            break;
                        };
                        let key: String = match message.get_payload() {
                            Ok(key) => key,
                            Err(err) => {
                                warn!("unreadable expiry notification: {}", err);
                                continue;
                            }
                        };
                        let Some(drone_id) = key.strip_prefix(VALUE_PREFIX) else {
                            continue;
                        };
                        let removed: RedisResult<i64> = index_conn.zrem(QUEUE_KEY, drone_id).await;
                        if let Err(err) = removed {
                            warn!("failed to prune expired drone {} from index: {}", drone_id, err);
                        }
                        debug!("violation for drone {} expired", drone_id);
                        expiry_changes.mark();
                    }
                }
            }
        });

        Ok(Self {
            conn,
            retention_ms,
            changes,
            stop: Mutex::new(Some(stop_tx)),
        })
    }
}

async fn reset_namespace(conn: &mut MultiplexedConnection) -> StoreResult<()> {
    let ids: Vec<String> = conn.zrange(QUEUE_KEY, 0, -1).await?;
    let mut keys: Vec<String> = ids.iter().map(|id| value_key(id)).collect();
    keys.push(QUEUE_KEY.to_string());
    let _: () = conn.del(keys).await?;
    Ok(())
}

#[async_trait]
impl ViolationStore for RemoteStore {
    async fn get(&self, drone_id: &str) -> StoreResult<Option<Violation>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(value_key(drone_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, drone_id: &str, violation: Violation) -> StoreResult<()> {
        let payload = serde_json::to_string(&violation)?;
        let score = violation.last_touched.timestamp_millis() as f64;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .pset_ex(value_key(drone_id), payload, self.retention_ms)
            .ignore()
            .zadd(QUEUE_KEY, drone_id, score)
            .ignore()
            .query_async(&mut conn)
            .await?;
        self.changes.mark();
        Ok(())
    }

    /// Removes every index entry last touched more than the retention window
    /// before `now`, together with its value.
    async fn evict_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let retention_ms = i64::try_from(self.retention_ms).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(retention_ms);
        let mut conn = self.conn.clone();
        let expired: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(QUEUE_KEY)
            .arg("-inf")
            .arg(format!("({}", cutoff))
            .query_async(&mut conn)
            .await?;
        if expired.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = expired.iter().map(|id| value_key(id)).collect();
        let _: () = redis::pipe()
            .del(keys)
            .ignore()
            .zrem(QUEUE_KEY, &expired)
            .ignore()
            .query_async(&mut conn)
            .await?;
        debug!("evicted {} violations missed by expiry notifications", expired.len());
        self.changes.mark();
        Ok(expired.len())
    }

    async fn as_slice(&self) -> StoreResult<Vec<Violation>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrevrange(QUEUE_KEY, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| value_key(id)).collect();
        let payloads: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        // Values can expire between the index read and the fetch; those are skipped.
        let mut snapshot = Vec::with_capacity(payloads.len());
        for payload in payloads.into_iter().flatten() {
            match serde_json::from_str::<Violation>(&payload) {
                Ok(violation) => snapshot.push(violation),
                Err(err) => warn!("skipping undecodable violation record: {}", err),
            }
        }
        Ok(snapshot)
    }

    fn has_changes(&self) -> bool {
        self.changes.take()
    }

    fn mark_changed(&self) {
        self.changes.mark();
    }

    async fn destroy(&self) {
        let sender = match self.stop.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }
}

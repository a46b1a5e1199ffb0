use anyhow::Context;
use birdnestcore::geofence::NoFlyZone;
use birdnestcore::{MonitorConfig, StoreBackend};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::feed::client::DEFAULT_FEED_URL;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub port: u16,
    /// Pause between drone position polls.
    pub sleep_ms: u64,
    /// How long a violating pilot stays listed after the last sighting.
    pub persist_minutes: u64,
    pub zone: NoFlyZone,
    pub store: StoreBackend,
    pub feed_url: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            sleep_ms: 2000,
            persist_minutes: 10,
            zone: NoFlyZone::default(),
            store: StoreBackend::Local,
            feed_url: DEFAULT_FEED_URL.to_string(),
        }
    }
}

impl WatcherConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading watcher config {}", path_ref.display()))?;
        let config: WatcherConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing watcher config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.persist_minutes.saturating_mul(60))
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: self.poll_interval(),
            zone: self.zone,
        }
    }
}

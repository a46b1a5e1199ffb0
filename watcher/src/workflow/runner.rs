use crate::feed::client::BirdnestClient;
use crate::web::bridge::WebBridge;
use crate::workflow::config::WatcherConfig;
use anyhow::Context;
use birdnestcore::{open_store, Monitor};
use log::info;
use std::future::Future;
use std::sync::Arc;

/// Wires the store, feed client, web bridge and monitor together.
#[derive(Clone)]
pub struct Runner {
    config: WatcherConfig,
}

impl Runner {
    pub fn new(config: WatcherConfig) -> Self {
        Self { config }
    }

    /// Runs until `shutdown` resolves. Fails fast if the store or the web
    /// server cannot be set up.
    pub async fn execute<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let store = open_store(&self.config.store, self.config.retention())
            .await
            .context("opening violation store")?;

        let bridge = Arc::new(WebBridge::new());
        let (addr, server) = bridge.serve(self.config.bind_address())?;
        info!("serving violations on http://{}", addr);

        let client = Arc::new(BirdnestClient::new(self.config.feed_url.clone()));
        let monitor = Monitor::new(
            self.config.to_monitor_config(),
            client.clone(),
            client,
            store,
        );
        monitor.run(bridge.as_ref(), shutdown).await;

        server.abort();
        Ok(())
    }
}

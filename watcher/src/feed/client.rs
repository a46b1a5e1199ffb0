use super::model::ReportDocument;
use async_trait::async_trait;
use birdnestcore::model::{Pilot, PositionReport};
use birdnestcore::prelude::{FeedError, FeedResult, PilotDirectory, ReportSource};
use log::debug;
use reqwest::Client;

pub const DEFAULT_FEED_URL: &str = "https://assignments.reaktor.com/birdnest";

/// HTTP client for the drone sensor feed and the pilot registry.
#[derive(Clone)]
pub struct BirdnestClient {
    client: Client,
    base_url: String,
}

impl BirdnestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_text(&self, url: String) -> FeedResult<String> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FeedError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        response
            .text()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))
    }
}

pub fn parse_report(xml: &str) -> FeedResult<PositionReport> {
    let document: ReportDocument =
        quick_xml::de::from_str(xml).map_err(|e| FeedError::Malformed(e.to_string()))?;
    Ok(document.into())
}

pub fn parse_pilot(json: &str) -> FeedResult<Pilot> {
    serde_json::from_str(json).map_err(|e| FeedError::Malformed(e.to_string()))
}

#[async_trait]
impl ReportSource for BirdnestClient {
    async fn current_positions(&self) -> FeedResult<PositionReport> {
        let body = self.fetch_text(format!("{}/drones", self.base_url)).await?;
        let report = parse_report(&body)?;
        debug!(
            "report at {} with {} drones",
            report.captured_at,
            report.samples.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl PilotDirectory for BirdnestClient {
    async fn resolve(&self, drone_id: &str) -> FeedResult<Pilot> {
        let body = self
            .fetch_text(format!("{}/pilots/{}", self.base_url, drone_id))
            .await?;
        parse_pilot(&body)
    }
}

use crate::model::{Pilot, PositionReport, Violation};
use async_trait::async_trait;

/// Failure reported by an external feed collaborator.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("malformed payload: {0}")]
    Malformed(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Failure raised by a violation store backend.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
    #[error("retention {0:?} is out of range")]
    InvalidRetention(std::time::Duration),
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("record encoding: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Source of drone position snapshots.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn current_positions(&self) -> FeedResult<PositionReport>;
}

/// Resolves the registered pilot of a drone.
#[async_trait]
pub trait PilotDirectory: Send + Sync {
    async fn resolve(&self, drone_id: &str) -> FeedResult<Pilot>;
}

/// Receives the ordered violation snapshot whenever the store changed.
///
/// Called synchronously from the reconciliation step, so implementations
/// should hand work off rather than block.
pub trait PresentationSink: Send + Sync {
    fn on_change(&self, snapshot: &[Violation]);
}

impl<F> PresentationSink for F
where
    F: Fn(&[Violation]) + Send + Sync,
{
    fn on_change(&self, snapshot: &[Violation]) {
        self(snapshot)
    }
}

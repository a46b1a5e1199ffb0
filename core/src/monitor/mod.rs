pub mod poller;
pub mod reconcile;

pub use poller::{Monitor, MonitorConfig, TickSummary};
pub use reconcile::Outcome;

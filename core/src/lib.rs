//! Core violation tracking for the Birdnest no-fly-zone monitor.
//!
//! The modules cover the geofence test, the recency-ordered violation store
//! (in-process and Redis-backed), and the polling monitor that reconciles each
//! drone report against the store.

pub mod geofence;
pub mod model;
pub mod monitor;
pub mod prelude;
pub mod store;
pub mod telemetry;

pub use monitor::{Monitor, MonitorConfig, TickSummary};
pub use prelude::{PilotDirectory, PresentationSink, ReportSource};
pub use store::{open_store, StoreBackend, ViolationStore};

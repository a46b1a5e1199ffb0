pub mod pilot;
pub mod position;
pub mod violation;

pub use pilot::Pilot;
pub use position::{PositionReport, PositionSample};
pub use violation::Violation;

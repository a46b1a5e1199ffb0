pub mod zone;

pub use zone::{NoFlyZone, Verdict, MILLIMETRES_PER_METRE};

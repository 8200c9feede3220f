pub mod bounds;
pub mod ids;
pub mod math;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use ids::*;
pub use math::{GeoPoint, distance_meters, offset};
pub use time::*;

//! Geographic primitives: locations and great-circle distance math.
//!
//! Everything here is pure. No sensor access, no state.

mod distance;
mod location;

pub use distance::{distance_meters, format_distance, is_within_radius, EARTH_RADIUS_M};
pub use location::Location;

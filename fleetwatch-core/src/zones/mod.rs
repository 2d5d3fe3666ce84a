//! Restricted Zones
//!
//! Polygon zones drawn by the operator. Only zones flagged as restricted
//! take part in geofence checks.

mod zone;

pub use zone::{Zone, ZoneStore, MIN_ZONE_VERTICES};

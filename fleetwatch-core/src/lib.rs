//! # Fleetwatch Core
//!
//! Platform-independent geofence monitor for vessel trajectories.
//!
//! This crate contains the monitoring logic with **zero I/O dependencies**:
//! no sockets, no files, no clocks. Callers feed it tracks, zones and tick
//! timestamps and read back statuses and alert records.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  fleetwatch-core (platform-independent, no tokio/async)     │
//! │  ├── geo          (point-in-polygon, bounding boxes)        │
//! │  ├── zones/       (restricted polygon store)                │
//! │  ├── tracks/      (actual + predicted tracks, CSV parsing)  │
//! │  ├── membership   (edge-triggered zone entry detection)     │
//! │  ├── alerts       (append-only alert log)                   │
//! │  ├── playback     (Stopped / Playing state machine)         │
//! │  └── engine/      (MonitorEngine: registry + tick)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  fleetwatch-server      │
//!                 │  (scheduler, REST, WS)  │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Example: One Vessel Crossing a Zone
//!
//! ```rust
//! use fleetwatch_core::{GeoPoint, MonitorEngine, TrackSet};
//!
//! let mut engine = MonitorEngine::new();
//! engine
//!     .add_zone(
//!         Some("Closed area"),
//!         vec![
//!             GeoPoint::new(124.40, 32.20),
//!             GeoPoint::new(124.45, 32.20),
//!             GeoPoint::new(124.45, 32.25),
//!             GeoPoint::new(124.40, 32.25),
//!         ],
//!         true,
//!     )
//!     .unwrap();
//!
//! let track = TrackSet::new(
//!     vec![
//!         GeoPoint::new(124.35, 32.18),
//!         GeoPoint::new(124.42, 32.22),
//!         GeoPoint::new(124.48, 32.22),
//!     ],
//!     vec![],
//! );
//! let vessel = engine.add_vessel(Some("Lu Yu 118"), track).unwrap();
//! engine.start(vessel).unwrap();
//!
//! assert_eq!(engine.tick(1_000).len(), 1); // entered
//! assert!(engine.tick(2_000).is_empty()); // left again
//! ```

pub mod alerts;
pub mod engine;
pub mod error;
pub mod geo;
pub mod membership;
pub mod playback;
pub mod tracks;
pub mod vessel;
pub mod zones;

// Re-export commonly used types
pub use alerts::{AlertLog, AlertRecord, HourlyCount};
pub use engine::{CsvImport, MonitorEngine, VesselDetail};
pub use error::{RowError, TrackError, ZoneError};
pub use geo::{point_in_polygon, GeoPoint};
pub use playback::{PlaybackState, StartRejected};
pub use tracks::TrackSet;
pub use vessel::VesselStatus;
pub use zones::{Zone, ZoneStore};

/// Caller-supplied name, or `"{prefix} {id}"` when absent or blank
pub(crate) fn display_name(name: Option<&str>, prefix: &str, id: u32) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{} {}", prefix, id),
    }
}

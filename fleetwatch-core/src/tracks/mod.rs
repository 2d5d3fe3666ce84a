//! Vessel Tracks
//!
//! A vessel carries one recorded ("actual") track and any number of
//! alternative or predicted tracks that are revealed after the actual
//! track has been played out.

pub mod csv;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Track type code for the recorded track
pub const ACTUAL_TRACK_TYPE: u32 = 0;

/// All position sequences belonging to one vessel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSet {
    /// Recorded positions, in playback order
    pub actual: Vec<GeoPoint>,
    /// Alternative or predicted tracks, ordered by type code
    pub predicted: Vec<Vec<GeoPoint>>,
}

impl TrackSet {
    pub fn new(actual: Vec<GeoPoint>, predicted: Vec<Vec<GeoPoint>>) -> Self {
        TrackSet { actual, predicted }
    }

    /// True when there is no position at all
    pub fn is_empty(&self) -> bool {
        self.actual.is_empty() && self.predicted.iter().all(|t| t.is_empty())
    }
}

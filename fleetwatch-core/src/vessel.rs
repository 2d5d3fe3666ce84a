//! Vessel entity: tracks plus the playback and membership state it owns.

use serde::Serialize;

use crate::geo::GeoPoint;
use crate::membership::MembershipTracker;
use crate::playback::{Playback, PlaybackState};
use crate::tracks::TrackSet;

#[derive(Debug, Clone)]
pub struct Vessel {
    pub id: u32,
    pub name: String,
    pub tracks: TrackSet,
    pub playback: Playback,
    pub membership: MembershipTracker,
}

impl Vessel {
    pub fn new(id: u32, name: String, tracks: TrackSet) -> Self {
        let playback = Playback::new(&tracks);
        Vessel {
            id,
            name,
            tracks,
            playback,
            membership: MembershipTracker::new(),
        }
    }

    pub fn position(&self) -> Option<GeoPoint> {
        self.playback.position(&self.tracks)
    }

    /// Stop, rewind and forget zone membership
    pub fn reset(&mut self) {
        self.playback.reset();
        self.membership.clear();
    }

    pub fn status(&self) -> VesselStatus {
        VesselStatus {
            id: self.id,
            name: self.name.clone(),
            state: self.playback.state(),
            index: self.playback.index(),
            track_len: self.tracks.actual.len(),
            position: self.position(),
            predicted_revealed: self.playback.revealed().to_vec(),
            predicted_len: self.tracks.predicted.iter().map(|t| t.len()).collect(),
            finished: self.playback.is_finished(&self.tracks),
            alert_visible: self.membership.alert_visible(),
            inside_zones: self.membership.zones().iter().copied().collect(),
        }
    }
}

/// Vessel snapshot for API responses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselStatus {
    pub id: u32,
    pub name: String,
    pub state: PlaybackState,
    /// Index into the actual track
    pub index: usize,
    /// Number of points in the actual track
    pub track_len: usize,
    /// Current position (None when the actual track is empty)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,
    /// Revealed points per predicted track
    pub predicted_revealed: Vec<usize>,
    /// Total points per predicted track
    pub predicted_len: Vec<usize>,
    pub finished: bool,
    /// True while inside at least one restricted zone
    pub alert_visible: bool,
    /// Restricted zones containing the vessel at the last tick
    pub inside_zones: Vec<u32>,
}

//! MonitorEngine - Single owner of zones, vessels and the alert log
//!
//! All mutation of monitor state goes through this type. A single
//! [`MonitorEngine::tick`] call advances every playing vessel once, runs
//! the geofence check for each and appends any new alerts.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           MonitorEngine                                  │
//! │  ├─ ZoneStore     (restricted polygons)                  │
//! │  ├─ Vessel registry (id → Vessel)                        │
//! │  │   ├─ TrackSet          (actual + predicted tracks)    │
//! │  │   ├─ Playback          (Stopped / Playing, index)     │
//! │  │   └─ MembershipTracker (zones at last tick)           │
//! │  └─ AlertLog      (append-only)                          │
//! └──────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use crate::alerts::{AlertLog, AlertRecord, HourlyCount};
use crate::error::{TrackError, ZoneError};
use crate::geo::GeoPoint;
use crate::playback::StartRejected;
use crate::tracks::csv::parse_tracks;
use crate::tracks::TrackSet;
use crate::vessel::{Vessel, VesselStatus};
use crate::zones::{Zone, ZoneStore};

/// Vessel status together with its full geometry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselDetail {
    #[serde(flatten)]
    pub status: VesselStatus,
    pub tracks: TrackSet,
}

/// Outcome of registering a vessel from CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImport {
    pub vessel_id: u32,
    /// Rows that became track points
    pub accepted: usize,
    /// Rows skipped as malformed (header rows included)
    pub dropped: usize,
}

#[derive(Debug)]
pub struct MonitorEngine {
    zones: ZoneStore,
    vessels: BTreeMap<u32, Vessel>,
    alerts: AlertLog,
    next_vessel_id: u32,
}

impl MonitorEngine {
    pub fn new() -> Self {
        MonitorEngine {
            zones: ZoneStore::new(),
            vessels: BTreeMap::new(),
            alerts: AlertLog::new(),
            next_vessel_id: 1,
        }
    }

    // =========================================================================
    // Zones
    // =========================================================================

    /// Add a zone from a completed polygon draw
    pub fn add_zone(
        &mut self,
        name: Option<&str>,
        vertices: Vec<GeoPoint>,
        restricted: bool,
    ) -> Result<Zone, ZoneError> {
        self.zones.add(name, vertices, restricted).cloned()
    }

    pub fn get_zone(&self, zone_id: u32) -> Option<&Zone> {
        self.zones.get(zone_id)
    }

    pub fn get_zones(&self) -> Vec<&Zone> {
        self.zones.zones()
    }

    /// Toggle the restricted flag.
    ///
    /// Lifting the restriction removes the zone from every vessel's tracked
    /// membership. Restoring it leaves membership alone, so a vessel already
    /// inside raises an alert on its next tick.
    pub fn set_zone_restricted(&mut self, zone_id: u32, restricted: bool) -> bool {
        if !self.zones.set_restricted(zone_id, restricted) {
            return false;
        }
        if !restricted {
            self.forget_zone(zone_id);
        }
        true
    }

    pub fn rename_zone(&mut self, zone_id: u32, name: &str) -> bool {
        self.zones.rename(zone_id, name)
    }

    pub fn remove_zone(&mut self, zone_id: u32) -> bool {
        if self.zones.remove(zone_id).is_none() {
            return false;
        }
        self.forget_zone(zone_id);
        true
    }

    fn forget_zone(&mut self, zone_id: u32) {
        for vessel in self.vessels.values_mut() {
            vessel.membership.forget_zone(zone_id);
        }
    }

    // =========================================================================
    // Vessels
    // =========================================================================

    /// Register a vessel. Returns None (and changes nothing) when there are no positions.
    pub fn add_vessel(&mut self, name: Option<&str>, tracks: TrackSet) -> Option<u32> {
        if tracks.is_empty() {
            return None;
        }
        let id = self.next_vessel_id;
        self.next_vessel_id += 1;
        let vessel = Vessel::new(id, crate::display_name(name, "Vessel", id), tracks);
        self.vessels.insert(id, vessel);
        Some(id)
    }

    /// Parse uploaded CSV and register the vessel
    pub fn add_vessel_csv(&mut self, name: Option<&str>, csv: &str) -> Result<CsvImport, TrackError> {
        let parsed = parse_tracks(csv)?;
        let vessel_id = self
            .add_vessel(name, parsed.tracks)
            .ok_or(TrackError::NoRows { dropped: parsed.dropped })?;
        Ok(CsvImport {
            vessel_id,
            accepted: parsed.accepted,
            dropped: parsed.dropped,
        })
    }

    pub fn remove_vessel(&mut self, vessel_id: u32) -> bool {
        self.vessels.remove(&vessel_id).is_some()
    }

    pub fn vessel_status(&self, vessel_id: u32) -> Option<VesselStatus> {
        self.vessels.get(&vessel_id).map(|v| v.status())
    }

    pub fn vessel_statuses(&self) -> Vec<VesselStatus> {
        self.vessels.values().map(|v| v.status()).collect()
    }

    pub fn vessel_detail(&self, vessel_id: u32) -> Option<VesselDetail> {
        self.vessels.get(&vessel_id).map(|v| VesselDetail {
            status: v.status(),
            tracks: v.tracks.clone(),
        })
    }

    pub fn vessel_count(&self) -> usize {
        self.vessels.len()
    }

    // =========================================================================
    // Playback commands
    // =========================================================================

    pub fn start(&mut self, vessel_id: u32) -> Result<(), StartRejected> {
        let vessel = self
            .vessels
            .get_mut(&vessel_id)
            .ok_or(StartRejected::UnknownVessel)?;
        vessel.playback.start(&vessel.tracks)
    }

    /// Returns true if the vessel was playing
    pub fn pause(&mut self, vessel_id: u32) -> bool {
        self.vessels
            .get_mut(&vessel_id)
            .map(|v| v.playback.pause())
            .unwrap_or(false)
    }

    /// Rewind to the first point and clear zone membership
    pub fn reset(&mut self, vessel_id: u32) -> bool {
        match self.vessels.get_mut(&vessel_id) {
            Some(vessel) => {
                vessel.reset();
                true
            }
            None => false,
        }
    }

    /// Start every vessel that can start. Returns how many did.
    pub fn start_all(&mut self) -> usize {
        self.vessels
            .values_mut()
            .filter_map(|v| v.playback.start(&v.tracks).ok())
            .count()
    }

    /// Pause every vessel. Returns how many were playing.
    pub fn pause_all(&mut self) -> usize {
        self.vessels
            .values_mut()
            .map(|v| v.playback.pause())
            .filter(|paused| *paused)
            .count()
    }

    pub fn reset_all(&mut self) {
        for vessel in self.vessels.values_mut() {
            vessel.reset();
        }
    }

    pub fn playing_count(&self) -> usize {
        self.vessels
            .values()
            .filter(|v| v.playback.is_playing())
            .count()
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance every playing vessel by one step and run the geofence check.
    ///
    /// On the first tick after creation or reset the starting position is
    /// checked before advancing, so a track that begins inside a zone still
    /// alerts. Vessels are visited in id order. Returns the alerts raised by
    /// this tick.
    pub fn tick(&mut self, timestamp: u64) -> Vec<AlertRecord> {
        let mut raised = Vec::new();

        for vessel in self.vessels.values_mut() {
            if !vessel.playback.is_playing() {
                continue;
            }
            if !vessel.playback.has_stepped() {
                check_position(&self.zones, &mut self.alerts, vessel, timestamp, &mut raised);
            }
            vessel.playback.step(&vessel.tracks);
            check_position(&self.zones, &mut self.alerts, vessel, timestamp, &mut raised);
        }

        raised
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    pub fn alerts(&self) -> &[AlertRecord] {
        self.alerts.records()
    }

    pub fn alerts_since(&self, after: u64) -> &[AlertRecord] {
        self.alerts.since(after)
    }

    /// Clear the alert log. Returns the number of records removed.
    pub fn clear_alerts(&mut self) -> usize {
        self.alerts.clear()
    }

    pub fn hourly_alert_counts(&self) -> Vec<HourlyCount> {
        self.alerts.hourly_counts()
    }
}

/// Geofence check for the vessel's current position. New entries are logged
/// and appended to `raised`.
fn check_position(
    zones: &ZoneStore,
    alerts: &mut AlertLog,
    vessel: &mut Vessel,
    timestamp: u64,
    raised: &mut Vec<AlertRecord>,
) {
    let Some(position) = vessel.position() else {
        return;
    };
    let inside = zones.restricted_containing(position);
    for zone_id in vessel.membership.update(inside) {
        let zone_name = zones
            .get(zone_id)
            .map(|z| z.name.as_str())
            .unwrap_or_default();
        let record = alerts.record(vessel.id, &vessel.name, zone_id, zone_name, timestamp);
        raised.push(record.clone());
    }
}

impl Default for MonitorEngine {
    fn default() -> Self {
        Self::new()
    }
}

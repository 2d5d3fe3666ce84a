//! Per-vessel zone membership tracking.
//!
//! Alerts are edge-triggered: only zones that appear in the new membership
//! set and were absent from the previous one count as entries.

use std::collections::BTreeSet;

/// Previous-tick membership of one vessel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipTracker {
    /// Restricted zones containing the vessel at the last evaluation
    current: BTreeSet<u32>,
    /// Display toggle: true while the vessel is inside any restricted zone
    alert_visible: bool,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the membership set and return the zones that were entered,
    /// in ascending id order.
    pub fn update(&mut self, inside: BTreeSet<u32>) -> Vec<u32> {
        let entered = inside.difference(&self.current).copied().collect();
        self.alert_visible = !inside.is_empty();
        self.current = inside;
        entered
    }

    /// Drop a zone from the tracked set (zone deleted or no longer restricted)
    pub fn forget_zone(&mut self, zone_id: u32) {
        if self.current.remove(&zone_id) {
            self.alert_visible = !self.current.is_empty();
        }
    }

    /// Forget everything, as on a playback reset
    pub fn clear(&mut self) {
        self.current.clear();
        self.alert_visible = false;
    }

    pub fn zones(&self) -> &BTreeSet<u32> {
        &self.current
    }

    pub fn alert_visible(&self) -> bool {
        self.alert_visible
    }
}

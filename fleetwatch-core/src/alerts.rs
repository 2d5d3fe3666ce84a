//! Append-only alert log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MS_PER_HOUR: u64 = 3_600_000;

/// Restricted-zone entry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Monotonic alert id (never reused, even after a clear)
    pub id: u64,
    /// Vessel that entered the zone
    pub vessel_id: u32,
    /// Vessel name at the time of the alert
    pub vessel_name: String,
    /// Zone that was entered
    pub zone_id: u32,
    /// Zone name at the time of the alert
    pub zone_name: String,
    /// Timestamp of the alert (milliseconds since the Unix epoch)
    pub timestamp: u64,
}

/// Number of alerts raised within one hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyCount {
    /// Start of the hour (milliseconds since the Unix epoch)
    pub hour_start: u64,
    pub count: usize,
}

#[derive(Debug)]
pub struct AlertLog {
    records: Vec<AlertRecord>,
    next_id: u64,
}

impl AlertLog {
    pub fn new() -> Self {
        AlertLog {
            records: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a new record and return it
    pub fn record(
        &mut self,
        vessel_id: u32,
        vessel_name: &str,
        zone_id: u32,
        zone_name: &str,
        timestamp: u64,
    ) -> &AlertRecord {
        let record = AlertRecord {
            id: self.next_id,
            vessel_id,
            vessel_name: vessel_name.to_string(),
            zone_id,
            zone_name: zone_name.to_string(),
            timestamp,
        };
        self.next_id += 1;
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// All records, oldest first
    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    /// Records with an id greater than `after`
    pub fn since(&self, after: u64) -> &[AlertRecord] {
        let start = self.records.partition_point(|r| r.id <= after);
        &self.records[start..]
    }

    /// Remove every record. Ids keep counting up.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Alerts bucketed by hour, oldest hour first. Hours without alerts are omitted.
    pub fn hourly_counts(&self) -> Vec<HourlyCount> {
        let mut buckets: BTreeMap<u64, usize> = BTreeMap::new();
        for record in &self.records {
            *buckets.entry(record.timestamp / MS_PER_HOUR * MS_PER_HOUR).or_default() += 1;
        }
        buckets
            .into_iter()
            .map(|(hour_start, count)| HourlyCount { hour_start, count })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}

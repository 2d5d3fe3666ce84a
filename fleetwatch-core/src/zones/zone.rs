//! Restricted Zone Implementation
//!
//! Defines operator-drawn polygon zones and the store that owns them.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ZoneError;
use crate::geo::{point_in_polygon, BoundingBox, GeoPoint};

/// Minimum number of vertices for a zone polygon
pub const MIN_ZONE_VERTICES: usize = 3;

/// Operator-defined polygon zone
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone identifier
    pub id: u32,
    /// Display name
    pub name: String,
    /// Boundary ring in drawing order (implicitly closed)
    pub vertices: Vec<GeoPoint>,
    /// Whether entering the zone raises an alert
    pub restricted: bool,
    #[serde(skip)]
    bounds: BoundingBox,
}

impl Zone {
    /// Validate the vertex ring and build a zone
    pub fn new(id: u32, name: String, vertices: Vec<GeoPoint>, restricted: bool) -> Result<Self, ZoneError> {
        validate_vertices(&vertices)?;
        let bounds = BoundingBox::from_points(&vertices).unwrap_or_default();
        Ok(Zone {
            id,
            name,
            vertices,
            restricted,
            bounds,
        })
    }

    /// Check if a position lies inside this zone's polygon (ignores the restricted flag)
    pub fn contains(&self, point: GeoPoint) -> bool {
        // Check bounds first (cheaper)
        if !self.bounds.contains(point) {
            return false;
        }
        point_in_polygon(point, &self.vertices)
    }
}

fn validate_vertices(vertices: &[GeoPoint]) -> Result<(), ZoneError> {
    if vertices.len() < MIN_ZONE_VERTICES {
        return Err(ZoneError::TooFewVertices {
            min: MIN_ZONE_VERTICES,
            actual: vertices.len(),
        });
    }
    if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
        return Err(ZoneError::NonFiniteVertex { index });
    }
    Ok(())
}

/// Polygon store holding every zone by id
#[derive(Debug, Default)]
pub struct ZoneStore {
    zones: BTreeMap<u32, Zone>,
    next_id: u32,
}

impl ZoneStore {
    pub fn new() -> Self {
        ZoneStore {
            zones: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Add a zone. The id is only consumed when the polygon is valid.
    pub fn add(
        &mut self,
        name: Option<&str>,
        vertices: Vec<GeoPoint>,
        restricted: bool,
    ) -> Result<&Zone, ZoneError> {
        let id = self.next_id.max(1);
        let zone = Zone::new(id, crate::display_name(name, "Zone", id), vertices, restricted)?;
        self.next_id = id + 1;
        let zone: &Zone = self.zones.entry(id).or_insert(zone);
        Ok(zone)
    }

    /// Get a zone by ID
    pub fn get(&self, zone_id: u32) -> Option<&Zone> {
        self.zones.get(&zone_id)
    }

    /// All zones in id order
    pub fn zones(&self) -> Vec<&Zone> {
        self.zones.values().collect()
    }

    /// Set the restricted flag. Returns false for an unknown zone.
    pub fn set_restricted(&mut self, zone_id: u32, restricted: bool) -> bool {
        match self.zones.get_mut(&zone_id) {
            Some(zone) => {
                zone.restricted = restricted;
                true
            }
            None => false,
        }
    }

    /// Rename a zone; a blank name falls back to the generated default
    pub fn rename(&mut self, zone_id: u32, name: &str) -> bool {
        match self.zones.get_mut(&zone_id) {
            Some(zone) => {
                zone.name = crate::display_name(Some(name), "Zone", zone_id);
                true
            }
            None => false,
        }
    }

    /// Remove a zone
    pub fn remove(&mut self, zone_id: u32) -> Option<Zone> {
        self.zones.remove(&zone_id)
    }

    /// Ids of restricted zones containing the position
    pub fn restricted_containing(&self, point: GeoPoint) -> BTreeSet<u32> {
        self.zones
            .values()
            .filter(|zone| zone.restricted && zone.contains(point))
            .map(|zone| zone.id)
            .collect()
    }

    /// Get number of zones
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

//! Geographic primitives and the point-in-polygon predicate.

use serde::{Deserialize, Serialize};

/// Added to the edge denominator so horizontal or zero-length edges never divide by zero.
pub const EDGE_EPSILON: f64 = 1e-12;

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        GeoPoint { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Axis-aligned bounds of a vertex ring
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Compute the bounds of a set of points. Returns None for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = BoundingBox {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for p in &points[1..] {
            bounds.min_lon = bounds.min_lon.min(p.lon);
            bounds.min_lat = bounds.min_lat.min(p.lat);
            bounds.max_lon = bounds.max_lon.max(p.lon);
            bounds.max_lat = bounds.max_lat.max(p.lat);
        }
        Some(bounds)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lon >= self.min_lon
            && point.lon <= self.max_lon
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }
}

/// Even-odd ray casting test.
///
/// The ring is treated as closed: the last vertex connects back to the first.
/// A ray is cast from `point` towards increasing longitude and the parity of
/// edge crossings decides the result. Rings with fewer than three vertices
/// contain nothing. Points lying exactly on an edge may land on either side.
pub fn point_in_polygon(point: GeoPoint, ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let crossing_lon =
                (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat + EDGE_EPSILON) + a.lon;
            if point.lon < crossing_lon {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(coords: &[(f64, f64)]) -> Vec<GeoPoint> {
        coords.iter().map(|&(lon, lat)| GeoPoint::new(lon, lat)).collect()
    }

    #[test]
    fn test_square() {
        let square = ring(&[(124.40, 32.20), (124.45, 32.20), (124.45, 32.25), (124.40, 32.25)]);

        assert!(point_in_polygon(GeoPoint::new(124.42, 32.22), &square));
        assert!(point_in_polygon(GeoPoint::new(124.449, 32.249), &square));

        assert!(!point_in_polygon(GeoPoint::new(124.35, 32.18), &square));
        assert!(!point_in_polygon(GeoPoint::new(124.48, 32.22), &square));
        assert!(!point_in_polygon(GeoPoint::new(124.42, 32.30), &square));
    }

    #[test]
    fn test_concave_u_shape() {
        // A "U" opening to the north: the notch between the arms is outside
        let u = ring(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]);

        assert!(point_in_polygon(GeoPoint::new(0.5, 2.0), &u)); // left arm
        assert!(point_in_polygon(GeoPoint::new(2.5, 2.0), &u)); // right arm
        assert!(point_in_polygon(GeoPoint::new(1.5, 0.5), &u)); // base
        assert!(!point_in_polygon(GeoPoint::new(1.5, 2.0), &u)); // notch
        assert!(!point_in_polygon(GeoPoint::new(-1.0, 2.0), &u));
        assert!(!point_in_polygon(GeoPoint::new(4.0, 0.5), &u));
    }

    #[test]
    fn test_triangle_winding_does_not_matter() {
        let ccw = ring(&[(0.0, 0.0), (4.0, 0.0), (2.0, 4.0)]);
        let cw = ring(&[(2.0, 4.0), (4.0, 0.0), (0.0, 0.0)]);
        let inside = GeoPoint::new(2.0, 1.0);
        let outside = GeoPoint::new(0.5, 3.0);

        assert!(point_in_polygon(inside, &ccw));
        assert!(point_in_polygon(inside, &cw));
        assert!(!point_in_polygon(outside, &ccw));
        assert!(!point_in_polygon(outside, &cw));
    }

    #[test]
    fn test_explicitly_closed_ring() {
        // Repeating the first vertex adds a zero-length edge, which must be harmless
        let closed = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]);
        assert!(point_in_polygon(GeoPoint::new(1.0, 1.0), &closed));
        assert!(!point_in_polygon(GeoPoint::new(3.0, 1.0), &closed));
    }

    #[test]
    fn test_ray_through_vertex_latitude() {
        // Query latitude equals a vertex latitude; horizontal edges must not toggle parity
        let diamond = ring(&[(1.0, 0.0), (2.0, 1.0), (1.0, 2.0), (0.0, 1.0)]);
        assert!(point_in_polygon(GeoPoint::new(1.0, 1.0), &diamond));
        assert!(!point_in_polygon(GeoPoint::new(-0.5, 1.0), &diamond));
        assert!(!point_in_polygon(GeoPoint::new(2.5, 1.0), &diamond));
    }

    #[test]
    fn test_degenerate_rings() {
        assert!(!point_in_polygon(GeoPoint::new(0.0, 0.0), &[]));
        let line = ring(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(!point_in_polygon(GeoPoint::new(0.5, 0.5), &line));
    }

    #[test]
    fn test_bounding_box() {
        let points = ring(&[(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]);
        let bounds = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bounds.min_lon, -2.0);
        assert_eq!(bounds.max_lon, 4.0);
        assert_eq!(bounds.min_lat, -1.0);
        assert_eq!(bounds.max_lat, 5.0);
        assert!(bounds.contains(GeoPoint::new(0.0, 0.0)));
        assert!(!bounds.contains(GeoPoint::new(5.0, 0.0)));
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}

//! Spherical distance helpers.
//!
//! Radii arrive in miles and are compared as central angles (radians), the
//! unit the store uses for `$maxDistance`-style queries.

use serde::{Deserialize, Serialize};

/// Earth radius used to convert miles into radians.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

/// A `[lng, lat]` point, serialized in GeoJSON coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(coords: [f64; 2]) -> Self {
        Self {
            lng: coords[0],
            lat: coords[1],
        }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lng, point.lat]
    }
}

pub fn miles_to_radians(miles: f64) -> f64 {
    miles / EARTH_RADIUS_MILES
}

/// Haversine central angle between two points, in radians.
pub fn central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

pub fn distance_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    central_angle(a, b) * EARTH_RADIUS_MILES
}

/// Lat/lng rectangle, in degrees, enclosing every point within a central angle
/// of a center. Used as an index-friendly prefilter ahead of the haversine test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

// Absorbs float noise at the box edges
const BOX_SLACK_DEGREES: f64 = 1e-9;

impl BoundingBox {
    pub fn around(center: GeoPoint, radians: f64) -> Self {
        let d_lat = radians.to_degrees() + BOX_SLACK_DEGREES;
        let min_lat = (center.lat - d_lat).max(-90.0);
        let max_lat = (center.lat + d_lat).min(90.0);

        // Circles touching a pole or crossing the antimeridian span every longitude
        let lat = center.lat.to_radians();
        let full_lng = min_lat <= -90.0
            || max_lat >= 90.0
            || radians >= std::f64::consts::FRAC_PI_2
            || radians.sin() >= lat.cos();
        if full_lng {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let d_lng = (radians.sin() / lat.cos()).asin().to_degrees() + BOX_SLACK_DEGREES;
        let (min_lng, max_lng) = (center.lng - d_lng, center.lng + d_lng);
        if min_lng < -180.0 || max_lng > 180.0 {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

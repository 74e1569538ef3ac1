// src/models/coordinate.rs
// DOCUMENTATION: Geographic coordinate value type
// PURPOSE: Shared lat/lng type with exact equality, drift-tolerant comparison and haversine distance

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius used by the great-circle fallback
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default tolerance (degrees) when comparing against a map-reported center
pub const CENTER_EPSILON: f64 = 1e-6;

/// Immutable latitude/longitude pair
/// DOCUMENTATION: `PartialEq` is exact field equality and is what change
/// detection uses. Use `approx_eq` only against centers reported by the map,
/// which may carry float drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn approx_eq(&self, other: &Coordinate, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon && (self.lng - other.lng).abs() <= epsilon
    }

    /// Great-circle distance in meters (haversine)
    pub fn haversine_distance(&self, other: &Coordinate) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lng / 2.0).sin().powi(2);

        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// `lat,lng` form used by provider query strings
    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

// geo-types uses x = longitude, y = latitude
impl From<Coordinate> for geo_types::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo_types::Point::new(c.lng, c.lat)
    }
}

impl From<geo_types::Point<f64>> for Coordinate {
    fn from(p: geo_types::Point<f64>) -> Self {
        Coordinate::new(p.y(), p.x())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_of_longitude_at_equator() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1.0);

        // 2 * pi * R / 360
        let expected = 111_194.926_644_558_7;
        assert!((a.haversine_distance(&b) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_haversine_symmetric_and_zero() {
        let a = Coordinate::new(39.8283, -98.5795);
        let b = Coordinate::new(39.8500, -98.5500);

        assert_eq!(a.haversine_distance(&a), 0.0);
        assert!((a.haversine_distance(&b) - b.haversine_distance(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_exact_vs_approx_equality() {
        let a = Coordinate::new(41.6488, -0.8891);
        let drifted = Coordinate::new(41.648_800_000_1, -0.889_100_000_2);

        assert_ne!(a, drifted);
        assert!(a.approx_eq(&drifted, CENTER_EPSILON));
        assert!(!a.approx_eq(&Coordinate::new(41.65, -0.8891), CENTER_EPSILON));
    }

    #[test]
    fn test_validity_and_geo_types_roundtrip() {
        assert!(Coordinate::new(90.0, -180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());

        let point: geo_types::Point<f64> = Coordinate::new(40.4168, -3.7038).into();
        assert_eq!(point.x(), -3.7038);
        assert_eq!(point.y(), 40.4168);
    }
}

//! MPTN-Resilience: structural and functional resilience of multi-modal
//! public transport networks.
//!
//! Core library for attack-order generation, percolation ensembles,
//! load-driven cascading failures and null-model comparison.

pub mod aggregate;
pub mod attack;
pub mod benchmark;
pub mod cascade;
pub mod centrality;
pub mod config;
pub mod error;
pub mod flow;
pub mod incremental;
pub mod motif;
pub mod network;
pub mod percolation;
pub mod progress;
pub mod recovery;
pub mod relocation;
pub mod report;
pub mod telemetry;
pub mod topology;

pub use error::{ResilienceError, Result};
pub use network::{EdgeKind, Network, NodeId, TransitMode};

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position of a stop or station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl GeoPoint {
    /// Create a new point.
    /// Returns None if the coordinates are not a valid longitude/latitude pair.
    pub fn new(lon: f64, lat: f64) -> Option<Self> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        Some(Self { lon, lat })
    }

    /// Great-circle distance in metres.
    /// Formula: d = 2R · asin(√(sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)))
    pub fn haversine_m(&self, other: &Self) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

        // Rounding can push `a` marginally above 1 for antipodal points
        let a = a.clamp(0.0, 1.0);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        assert!(GeoPoint::new(114.3, 30.6).is_some());
        assert!(GeoPoint::new(-180.0, 90.0).is_some());
        assert!(GeoPoint::new(181.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -91.0).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_haversine_self() {
        let p = GeoPoint::new(114.30, 30.59).unwrap();
        assert!(p.haversine_m(&p) < 1e-9);
    }

    #[test]
    fn test_haversine_symmetry() {
        let a = GeoPoint::new(114.30, 30.59).unwrap();
        let b = GeoPoint::new(114.27, 30.62).unwrap();
        assert!((a.haversine_m(&b) - b.haversine_m(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is R·π/180 along a meridian
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((a.haversine_m(&b) - expected).abs() < 1e-6);
    }
}
